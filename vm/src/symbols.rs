use rustc_hash::FxHashMap;

use crate::image::{BinaryImage, Def};

/// Name and offset indexes over an image's defs and functions.
///
/// Built once after load. When several entries share a name or offset the
/// first one in table order is indexed, matching a front-to-back scan.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    globals_by_name: FxHashMap<Box<[u8]>, u32>,
    fields_by_name: FxHashMap<Box<[u8]>, u32>,
    functions_by_name: FxHashMap<Box<[u8]>, u32>,
    globals_by_ofs: FxHashMap<u16, u32>,
    fields_by_ofs: FxHashMap<u16, u32>,
}

impl SymbolTable {
    pub fn build(image: &BinaryImage) -> Self {
        let mut table = Self::default();

        let name_of = |ofs| -> Box<[u8]> {
            image.strings.get_bytes(ofs).unwrap_or_default().into()
        };

        index_defs(
            &image.global_defs,
            &name_of,
            &mut table.globals_by_name,
            &mut table.globals_by_ofs,
        );
        index_defs(
            &image.field_defs,
            &name_of,
            &mut table.fields_by_name,
            &mut table.fields_by_ofs,
        );
        for (i, func) in image.functions.iter().enumerate() {
            table
                .functions_by_name
                .entry(name_of(func.name))
                .or_insert(i as u32);
        }
        table
    }

    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.globals_by_name.get(name.as_bytes()).map(|&i| i as usize)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields_by_name.get(name.as_bytes()).map(|&i| i as usize)
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions_by_name.get(name.as_bytes()).map(|&i| i as usize)
    }

    pub fn global_index_at(&self, ofs: u16) -> Option<usize> {
        self.globals_by_ofs.get(&ofs).map(|&i| i as usize)
    }

    pub fn field_index_at(&self, ofs: u16) -> Option<usize> {
        self.fields_by_ofs.get(&ofs).map(|&i| i as usize)
    }
}

fn index_defs(
    defs: &[Def],
    name_of: &impl Fn(crate::image::StringOfs) -> Box<[u8]>,
    by_name: &mut FxHashMap<Box<[u8]>, u32>,
    by_ofs: &mut FxHashMap<u16, u32>,
) {
    for (i, def) in defs.iter().enumerate() {
        by_name.entry(name_of(def.name)).or_insert(i as u32);
        by_ofs.entry(def.offset).or_insert(i as u32);
    }
}
