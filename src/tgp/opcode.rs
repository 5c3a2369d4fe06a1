//! Display-list opcodes

/// Record type codes understood by the list walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    DrawObject,
    DrawDirect,
    SetViewport,
    UploadColor,
    UploadPoly,
    UploadLight,
    CounterInc,
    SelectMode,
    SetZoom,
    SetLightDir,
    SetMatrix,
    SetTranslation,
    End,
}

impl Opcode {
    /// Decode a record type; `None` for anything the walker does not know
    pub fn decode(code: u32) -> Option<Opcode> {
        Some(match code {
            0x00 => Opcode::Nop,
            0x01 | 0x41 => Opcode::DrawObject,
            0x02 => Opcode::DrawDirect,
            0x03 => Opcode::SetViewport,
            0x04 => Opcode::UploadColor,
            0x05 => Opcode::UploadPoly,
            0x06 => Opcode::UploadLight,
            0x07 => Opcode::CounterInc,
            0x08 => Opcode::SelectMode,
            0x09 => Opcode::SetZoom,
            0x0a => Opcode::SetLightDir,
            0x0b => Opcode::SetMatrix,
            0x0c => Opcode::SetTranslation,
            0x0f => Opcode::End,
            _ => return None,
        })
    }

    /// Canonical code written by the encoder
    pub fn code(self) -> u32 {
        match self {
            Opcode::Nop => 0x00,
            Opcode::DrawObject => 0x01,
            Opcode::DrawDirect => 0x02,
            Opcode::SetViewport => 0x03,
            Opcode::UploadColor => 0x04,
            Opcode::UploadPoly => 0x05,
            Opcode::UploadLight => 0x06,
            Opcode::CounterInc => 0x07,
            Opcode::SelectMode => 0x08,
            Opcode::SetZoom => 0x09,
            Opcode::SetLightDir => 0x0a,
            Opcode::SetMatrix => 0x0b,
            Opcode::SetTranslation => 0x0c,
            Opcode::End => 0x0f,
        }
    }

    /// Record length in words for fixed-size records
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Opcode::Nop => Some(2),
            Opcode::DrawObject => Some(8),
            Opcode::SetViewport => Some(16),
            Opcode::CounterInc | Opcode::SelectMode => Some(4),
            Opcode::SetZoom | Opcode::SetTranslation => Some(6),
            Opcode::SetLightDir => Some(8),
            Opcode::SetMatrix => Some(26),
            Opcode::DrawDirect
            | Opcode::UploadColor
            | Opcode::UploadPoly
            | Opcode::UploadLight
            | Opcode::End => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_codes() {
        for code in [0x0, 0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xa, 0xb, 0xc, 0xf] {
            let op = Opcode::decode(code).unwrap();
            assert_eq!(op.code(), code);
        }
        assert_eq!(Opcode::decode(0x41), Some(Opcode::DrawObject));
    }

    #[test]
    fn test_decode_unknown() {
        for code in [0xd, 0xe, 0x10, 0x40, 0xffff_ffff] {
            assert_eq!(Opcode::decode(code), None);
        }
    }
}
