//! Opcode constants and their canonical names.
//!
//! Only the opcodes that appear in standard locking and unlocking scripts are
//! named individually; every byte still maps to a name for ASM rendering.

pub const OP_0: u8 = 0x00;
pub const OP_FALSE: u8 = 0x00;
pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_32: u8 = 0x20;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_RESERVED: u8 = 0x50;
pub const OP_1: u8 = 0x51;
pub const OP_TRUE: u8 = 0x51;
pub const OP_2: u8 = 0x52;
pub const OP_3: u8 = 0x53;
pub const OP_16: u8 = 0x60;
pub const OP_NOP: u8 = 0x61;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_VERIF: u8 = 0x65;
pub const OP_VERNOTIF: u8 = 0x66;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_SIZE: u8 = 0x82;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_ADD: u8 = 0x93;
pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
pub const OP_CHECKSIGADD: u8 = 0xba;

/// Names for the non-push opcodes from `OP_1NEGATE` upward, indexed by
/// `op - OP_1NEGATE`.
const NAMES: [&str; 0xbb - 0x4f] = [
    "OP_1NEGATE", "OP_RESERVED", "OP_1", "OP_2", "OP_3", "OP_4", "OP_5", "OP_6", "OP_7",
    "OP_8", "OP_9", "OP_10", "OP_11", "OP_12", "OP_13", "OP_14", "OP_15", "OP_16",
    "OP_NOP", "OP_VER", "OP_IF", "OP_NOTIF", "OP_VERIF", "OP_VERNOTIF", "OP_ELSE",
    "OP_ENDIF", "OP_VERIFY", "OP_RETURN", "OP_TOALTSTACK", "OP_FROMALTSTACK",
    "OP_2DROP", "OP_2DUP", "OP_3DUP", "OP_2OVER", "OP_2ROT", "OP_2SWAP", "OP_IFDUP",
    "OP_DEPTH", "OP_DROP", "OP_DUP", "OP_NIP", "OP_OVER", "OP_PICK", "OP_ROLL", "OP_ROT",
    "OP_SWAP", "OP_TUCK", "OP_CAT", "OP_SUBSTR", "OP_LEFT", "OP_RIGHT", "OP_SIZE",
    "OP_INVERT", "OP_AND", "OP_OR", "OP_XOR", "OP_EQUAL", "OP_EQUALVERIFY",
    "OP_RESERVED1", "OP_RESERVED2", "OP_1ADD", "OP_1SUB", "OP_2MUL", "OP_2DIV",
    "OP_NEGATE", "OP_ABS", "OP_NOT", "OP_0NOTEQUAL", "OP_ADD", "OP_SUB", "OP_MUL",
    "OP_DIV", "OP_MOD", "OP_LSHIFT", "OP_RSHIFT", "OP_BOOLAND", "OP_BOOLOR",
    "OP_NUMEQUAL", "OP_NUMEQUALVERIFY", "OP_NUMNOTEQUAL", "OP_LESSTHAN",
    "OP_GREATERTHAN", "OP_LESSTHANOREQUAL", "OP_GREATERTHANOREQUAL", "OP_MIN", "OP_MAX",
    "OP_WITHIN", "OP_RIPEMD160", "OP_SHA1", "OP_SHA256", "OP_HASH160", "OP_HASH256",
    "OP_CODESEPARATOR", "OP_CHECKSIG", "OP_CHECKSIGVERIFY", "OP_CHECKMULTISIG",
    "OP_CHECKMULTISIGVERIFY", "OP_NOP1", "OP_CHECKLOCKTIMEVERIFY",
    "OP_CHECKSEQUENCEVERIFY", "OP_NOP4", "OP_NOP5", "OP_NOP6", "OP_NOP7", "OP_NOP8",
    "OP_NOP9", "OP_NOP10", "OP_CHECKSIGADD",
];

/// Canonical name of an opcode byte.
///
/// Direct pushes render as `OP_DATA_<n>`; bytes above `OP_CHECKSIGADD` are
/// `OP_UNKNOWN<n>`.
pub fn opcode_to_string(op: u8) -> String {
    match op {
        OP_0 => "OP_FALSE".to_string(),
        OP_DATA_1..=OP_DATA_75 => format!("OP_DATA_{}", op),
        OP_PUSHDATA1 => "OP_PUSHDATA1".to_string(),
        OP_PUSHDATA2 => "OP_PUSHDATA2".to_string(),
        OP_PUSHDATA4 => "OP_PUSHDATA4".to_string(),
        OP_1NEGATE..=OP_CHECKSIGADD => NAMES[(op - OP_1NEGATE) as usize].to_string(),
        _ => format!("OP_UNKNOWN{}", op),
    }
}

/// Parse an ASM token naming a non-push opcode.
///
/// Accepts `OP_0`/`OP_FALSE` and `OP_TRUE` aliases. Push opcodes and data
/// tokens return `None`.
pub fn string_to_opcode(name: &str) -> Option<u8> {
    match name {
        "OP_0" | "OP_FALSE" => return Some(OP_0),
        "OP_TRUE" => return Some(OP_TRUE),
        _ => {}
    }
    NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| OP_1NEGATE + i as u8)
}

/// Whether `op` is `OP_0` or one of `OP_1`..`OP_16`.
pub fn is_small_int_op(op: u8) -> bool {
    op == OP_0 || (OP_1..=OP_16).contains(&op)
}

/// Value pushed by a small-integer opcode.
pub fn small_int_value(op: u8) -> Option<u8> {
    match op {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some(op - OP_1 + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_table_aligned() {
        assert_eq!(opcode_to_string(OP_DUP), "OP_DUP");
        assert_eq!(opcode_to_string(OP_HASH160), "OP_HASH160");
        assert_eq!(opcode_to_string(OP_CHECKSIG), "OP_CHECKSIG");
        assert_eq!(opcode_to_string(OP_CHECKSIGADD), "OP_CHECKSIGADD");
        assert_eq!(opcode_to_string(OP_16), "OP_16");
        assert_eq!(opcode_to_string(OP_CODESEPARATOR), "OP_CODESEPARATOR");
        assert_eq!(opcode_to_string(0xff), "OP_UNKNOWN255");
    }

    #[test]
    fn test_string_to_opcode() {
        assert_eq!(string_to_opcode("OP_EQUALVERIFY"), Some(OP_EQUALVERIFY));
        assert_eq!(string_to_opcode("OP_FALSE"), Some(OP_0));
        assert_eq!(string_to_opcode("OP_2"), Some(OP_2));
        assert_eq!(string_to_opcode("deadbeef"), None);
    }

    #[test]
    fn test_small_ints() {
        assert!(is_small_int_op(OP_0));
        assert!(is_small_int_op(OP_16));
        assert!(!is_small_int_op(OP_1NEGATE));
        assert_eq!(small_int_value(OP_3), Some(3));
        assert_eq!(small_int_value(OP_DUP), None);
    }
}
