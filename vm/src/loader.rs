use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::image::*;

/// What to do when the computed image checksum disagrees with the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Refuse the image.
    Fatal,
    /// Load it and record a warning.
    #[default]
    Warn,
    /// Skip verification.
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub expected_checksum: Option<u32>,
    pub checksum_policy: ChecksumPolicy,
}

impl LoadOptions {
    pub fn new(expected_checksum: Option<u32>, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            expected_checksum,
            checksum_policy,
        }
    }

    /// No checksum verification at all.
    pub fn unchecked() -> Self {
        Self::new(None, ChecksumPolicy::Off)
    }
}

/// Non-fatal conditions noticed while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWarning {
    /// Recognized alternate dialect; some opcodes may be unsupported.
    AlternateDialect { version: i32 },
    ChecksumMismatch { computed: u32, expected: u32 },
    ChecksumDisabled { computed: u32 },
}

/// Parses a little-endian progs image.
pub fn parse(bytes: &[u8], opts: &LoadOptions) -> Result<BinaryImage, LoadError> {
    parse_with::<LittleEndian>(bytes, opts)
}

/// Parses an image stored in byte order `B` into canonical in-memory values.
///
/// This is the single normalization pass: every multi-byte field is decoded
/// exactly once into the returned tables, and the input buffer is never
/// mutated.
pub fn parse_with<B: ByteOrder>(bytes: &[u8], opts: &LoadOptions) -> Result<BinaryImage, LoadError> {
    if bytes.len() < HEADER_SIZE {
        return Err(LoadError::Truncated {
            what: "header",
            need: HEADER_SIZE,
            have: bytes.len(),
        });
    }

    let header = read_header::<B>(bytes)?;
    let mut warnings = Vec::new();

    if header.version != PROG_VERSION {
        if header.version == FTE_PROG_VERSION {
            warn!(
                version = header.version,
                "progs is FTE version and not all opcodes are supported"
            );
            warnings.push(LoadWarning::AlternateDialect {
                version: header.version,
            });
        } else {
            return Err(LoadError::VersionMismatch {
                found: header.version,
                expected: PROG_VERSION,
            });
        }
    }

    let checksum = crc32fast::hash(bytes);
    verify_checksum(checksum, opts, &mut warnings)?;

    let statements = table(bytes, "statements", header.statements, STATEMENT_SIZE)?
        .chunks_exact(STATEMENT_SIZE)
        .map(|rec| Statement {
            op: B::read_u16(&rec[0..]),
            a: B::read_u16(&rec[2..]),
            b: B::read_u16(&rec[4..]),
            c: B::read_u16(&rec[6..]),
        })
        .collect::<Vec<_>>();

    let global_defs = read_defs::<B>(
        table(bytes, "globaldefs", header.global_defs, DEF_SIZE)?,
        "globaldefs",
        false,
    )?;
    let field_defs = read_defs::<B>(
        table(bytes, "fielddefs", header.field_defs, DEF_SIZE)?,
        "fielddefs",
        true,
    )?;

    let functions = table(bytes, "functions", header.functions, FUNCTION_SIZE)?
        .chunks_exact(FUNCTION_SIZE)
        .map(|rec| {
            let mut parm_size = [0u8; MAX_PARMS];
            parm_size.copy_from_slice(&rec[28..36]);
            FunctionDef {
                first_statement: B::read_i32(&rec[0..]),
                parm_start: B::read_i32(&rec[4..]),
                locals: B::read_i32(&rec[8..]),
                profile: B::read_u32(&rec[12..]),
                name: StringOfs(B::read_i32(&rec[16..]) as u32),
                file: StringOfs(B::read_i32(&rec[20..]) as u32),
                num_parms: B::read_i32(&rec[24..]),
                parm_size,
            }
        })
        .collect::<Vec<_>>();

    let strings = StringBlob::new(table(bytes, "strings", header.strings, 1)?.to_vec());

    let globals = table(bytes, "globals", header.globals, 4)?
        .chunks_exact(4)
        .map(B::read_u32)
        .collect::<Vec<_>>();

    let image = BinaryImage {
        header,
        statements,
        global_defs,
        field_defs,
        functions,
        globals,
        strings,
        checksum,
        byte_size: bytes.len(),
        warnings,
    };
    validate(&image)?;

    debug!(
        functions = image.functions.len(),
        statements = image.statements.len(),
        checksum = image.checksum,
        "progs parsed"
    );
    Ok(image)
}

fn read_header<B: ByteOrder>(bytes: &[u8]) -> Result<Header, LoadError> {
    let mut rdr = Cursor::new(bytes);
    let range = |rdr: &mut Cursor<&[u8]>| -> Result<TableRange, LoadError> {
        Ok(TableRange {
            offset: rdr.read_i32::<B>()?,
            count: rdr.read_i32::<B>()?,
        })
    };

    let version = rdr.read_i32::<B>()?;
    let defs_crc = rdr.read_i32::<B>()?;
    let statements = range(&mut rdr)?;
    let global_defs = range(&mut rdr)?;
    let field_defs = range(&mut rdr)?;
    let functions = range(&mut rdr)?;
    let strings = range(&mut rdr)?;
    let globals = range(&mut rdr)?;
    let entity_fields = rdr.read_i32::<B>()?;

    Ok(Header {
        version,
        defs_crc,
        statements,
        global_defs,
        field_defs,
        functions,
        strings,
        globals,
        entity_fields,
    })
}

fn verify_checksum(
    computed: u32,
    opts: &LoadOptions,
    warnings: &mut Vec<LoadWarning>,
) -> Result<(), LoadError> {
    if opts.checksum_policy == ChecksumPolicy::Off {
        warn!(checksum = computed, "progs checksum check disabled");
        warnings.push(LoadWarning::ChecksumDisabled { computed });
        return Ok(());
    }

    let Some(expected) = opts.expected_checksum else {
        debug!(checksum = computed, "no expected checksum configured");
        return Ok(());
    };

    if computed == expected {
        return Ok(());
    }

    match opts.checksum_policy {
        ChecksumPolicy::Fatal => Err(LoadError::ChecksumMismatch { computed, expected }),
        _ => {
            warn!(
                computed,
                expected, "progs has wrong checksum (recompile progs with up to date headers)"
            );
            warnings.push(LoadWarning::ChecksumMismatch { computed, expected });
            Ok(())
        }
    }
}

/// Slice of `bytes` covered by a header range, checked against the buffer.
fn table<'a>(
    bytes: &'a [u8],
    name: &'static str,
    range: TableRange,
    elem_size: usize,
) -> Result<&'a [u8], LoadError> {
    let out_of_bounds = || LoadError::TableOutOfBounds {
        table: name,
        offset: range.offset,
        count: range.count,
        size: bytes.len(),
    };

    if range.offset < 0 || range.count < 0 {
        return Err(out_of_bounds());
    }
    let start = range.offset as usize;
    let len = (range.count as usize)
        .checked_mul(elem_size)
        .ok_or_else(out_of_bounds)?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
    bytes.get(start..end).ok_or_else(out_of_bounds)
}

fn read_defs<B: ByteOrder>(raw: &[u8], table: &'static str, fields: bool) -> Result<Vec<Def>, LoadError> {
    raw.chunks_exact(DEF_SIZE)
        .enumerate()
        .map(|(index, rec)| {
            let tag = B::read_u16(&rec[0..]);
            let save_global = tag & DEF_SAVEGLOBAL != 0;
            if fields && save_global {
                return Err(LoadError::InvalidFieldFlag { index });
            }
            let ty = ValueType::from_u16(tag & !DEF_SAVEGLOBAL)
                .ok_or(LoadError::UnknownType { table, index, tag })?;
            Ok(Def {
                ty,
                save_global,
                offset: B::read_u16(&rec[2..]),
                name: StringOfs(B::read_i32(&rec[4..]) as u32),
            })
        })
        .collect()
}

/// Cross-table checks, run once so later lookups can index without checks.
fn validate(image: &BinaryImage) -> Result<(), LoadError> {
    let blob = &image.strings;
    let string_ok = |table: &'static str, index: usize, ofs: StringOfs| {
        if blob.contains(ofs.0) {
            Ok(())
        } else {
            Err(LoadError::BadStringOffset {
                table,
                index,
                offset: ofs.0 as i32,
                size: blob.len(),
            })
        }
    };

    for (index, def) in image.global_defs.iter().enumerate() {
        string_ok("globaldefs", index, def.name)?;
        if def.slots().end > image.globals.len() {
            return Err(LoadError::BadDefOffset {
                table: "globaldefs",
                index,
                offset: def.offset,
                limit: image.globals.len(),
            });
        }
    }

    if image.header.entity_fields < 0 {
        return Err(LoadError::TableOutOfBounds {
            table: "entityfields",
            offset: 0,
            count: image.header.entity_fields,
            size: image.byte_size,
        });
    }
    let field_slots = image.entity_fields();
    for (index, def) in image.field_defs.iter().enumerate() {
        string_ok("fielddefs", index, def.name)?;
        if def.slots().end > field_slots {
            return Err(LoadError::BadDefOffset {
                table: "fielddefs",
                index,
                offset: def.offset,
                limit: field_slots,
            });
        }
    }

    for (index, func) in image.functions.iter().enumerate() {
        string_ok("functions", index, func.name)?;
        string_ok("functions", index, func.file)?;
        if func.first_statement >= 0 && func.first_statement as usize >= image.statements.len().max(1) {
            return Err(LoadError::BadFunction {
                index,
                reason: format!(
                    "first statement {} past the {}-entry statement table",
                    func.first_statement,
                    image.statements.len()
                ),
            });
        }
        if func.num_parms < 0 || func.num_parms as usize > MAX_PARMS {
            return Err(LoadError::BadFunction {
                index,
                reason: format!("{} parameters", func.num_parms),
            });
        }
    }

    Ok(())
}
