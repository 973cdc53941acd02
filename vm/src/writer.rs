use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::image::*;

/// Header for the given tables laid out back to back after the header, in the
/// order `encode` writes them.
pub fn layout_header(image: &BinaryImage) -> Header {
    let mut ofs = HEADER_SIZE;
    let mut next = |count: usize, elem_size: usize| {
        let range = TableRange {
            offset: ofs as i32,
            count: count as i32,
        };
        ofs += count * elem_size;
        range
    };

    let statements = next(image.statements.len(), STATEMENT_SIZE);
    let global_defs = next(image.global_defs.len(), DEF_SIZE);
    let field_defs = next(image.field_defs.len(), DEF_SIZE);
    let functions = next(image.functions.len(), FUNCTION_SIZE);
    let strings = next(image.strings.len(), 1);
    let globals = next(image.globals.len(), 4);

    Header {
        version: image.header.version,
        defs_crc: image.header.defs_crc,
        statements,
        global_defs,
        field_defs,
        functions,
        strings,
        globals,
        entity_fields: image.header.entity_fields,
    }
}

/// Serializes an image in byte order `B`. Table offsets are recomputed, so the
/// output of `encode` fed back through the loader encodes to the same bytes.
pub fn encode<B: ByteOrder>(image: &BinaryImage) -> Vec<u8> {
    let header = layout_header(image);
    let mut out = Vec::with_capacity(header.globals.offset as usize + image.globals.len() * 4);

    // Writing into a Vec never fails.
    let _ = write_image::<B, _>(&mut out, &header, image);
    out
}

pub fn encode_le(image: &BinaryImage) -> Vec<u8> {
    encode::<LittleEndian>(image)
}

fn write_image<B: ByteOrder, W: Write>(w: &mut W, header: &Header, image: &BinaryImage) -> std::io::Result<()> {
    w.write_i32::<B>(header.version)?;
    w.write_i32::<B>(header.defs_crc)?;
    for range in [
        header.statements,
        header.global_defs,
        header.field_defs,
        header.functions,
        header.strings,
        header.globals,
    ] {
        w.write_i32::<B>(range.offset)?;
        w.write_i32::<B>(range.count)?;
    }
    w.write_i32::<B>(header.entity_fields)?;

    for st in &image.statements {
        w.write_u16::<B>(st.op)?;
        w.write_u16::<B>(st.a)?;
        w.write_u16::<B>(st.b)?;
        w.write_u16::<B>(st.c)?;
    }

    for def in image.global_defs.iter().chain(&image.field_defs) {
        let mut tag = def.ty.as_u16();
        if def.save_global {
            tag |= DEF_SAVEGLOBAL;
        }
        w.write_u16::<B>(tag)?;
        w.write_u16::<B>(def.offset)?;
        w.write_i32::<B>(def.name.0 as i32)?;
    }

    for func in &image.functions {
        w.write_i32::<B>(func.first_statement)?;
        w.write_i32::<B>(func.parm_start)?;
        w.write_i32::<B>(func.locals)?;
        w.write_u32::<B>(func.profile)?;
        w.write_i32::<B>(func.name.0 as i32)?;
        w.write_i32::<B>(func.file.0 as i32)?;
        w.write_i32::<B>(func.num_parms)?;
        w.write_all(&func.parm_size)?;
    }

    w.write_all(image.strings.as_bytes())?;

    for &slot in &image.globals {
        w.write_u32::<B>(slot)?;
    }
    Ok(())
}
