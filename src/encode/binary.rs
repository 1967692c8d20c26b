use rand::RngCore;

use super::{map_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

pub struct BinaryTransform;

impl Transform for BinaryTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Binary
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(map_bytes(payload, " ", |b| format!("{:08b}", b)));
        out.push(map_bytes(payload, "", |b| format!("{:08b}", b)));
        out.push(map_bytes(payload, " ", |b| format!("0b{:08b}", b)));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(map_bytes(payload, ",", |b| format!("{:b}", b)));
        out.push(format!(
            "String.fromCharCode({})",
            map_bytes(payload, ",", |b| format!("0b{:b}", b))
        ));
        out.push(format!(
            "CHAR({})",
            map_bytes(payload, ",", |b| format!("CONV('{:b}',2,10)", b))
        ));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(format!(
            "bytes([{}]).decode()",
            map_bytes(payload, ",", |b| format!("0b{:b}", b))
        ));
        out.push(map_bytes(payload, "", |b| format!("parseInt('{:b}',2)", b)));

        let separators = [" ", ",", ";", "|", "\t"];
        let mut mixed = String::new();
        for (i, b) in payload.bytes().enumerate() {
            if i > 0 {
                mixed.push_str(separators[i % separators.len()]);
            }
            mixed.push_str(&format!("{:08b}", b));
        }
        out.push(mixed);
    }

    fn force_encode(&self, payload: &str) -> String {
        map_bytes(payload, " ", |b| format!("{:08b}", b))
    }
}
