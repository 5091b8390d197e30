use thiserror::Error;

pub const OP_RETURN: u8 = 0x6a;
const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Invalid script hex: {0}")]
    Hex(String),
    #[error("Push truncated at byte {0}")]
    Truncated(usize),
    #[error("Non-push opcode 0x{opcode:02x} at byte {position}")]
    NonPush { opcode: u8, position: usize },
}

/// Hash160 paid to by a P2PKH or P2SH output script
pub fn output_script_hash160(script_hex: &str) -> Option<&str> {
    // 76a914 <20 bytes> 88ac
    if script_hex.len() == 50 && script_hex.starts_with("76a914") && script_hex.ends_with("88ac") {
        return Some(&script_hex[6..46]);
    }
    // a914 <20 bytes> 87
    if script_hex.len() == 46 && script_hex.starts_with("a914") && script_hex.ends_with("87") {
        return Some(&script_hex[4..44]);
    }
    None
}

pub fn is_op_return(script_hex: &str) -> bool {
    script_hex.starts_with("6a")
}

fn read_push_len(script: &[u8], pos: usize, width: usize) -> Result<usize, ScriptError> {
    let bytes = script
        .get(pos..pos + width)
        .ok_or(ScriptError::Truncated(pos))?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize))
}

/// Split a push-only script into its data pushes
pub fn parse_pushes(script: &[u8]) -> Result<Vec<Vec<u8>>, ScriptError> {
    let mut pushes = Vec::new();
    let mut pos = 0usize;

    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;

        let len = match opcode {
            OP_0 => 0,
            0x01..=0x4b => opcode as usize,
            OP_PUSHDATA1 => {
                let len = read_push_len(script, pos, 1)?;
                pos += 1;
                len
            }
            OP_PUSHDATA2 => {
                let len = read_push_len(script, pos, 2)?;
                pos += 2;
                len
            }
            OP_PUSHDATA4 => {
                let len = read_push_len(script, pos, 4)?;
                pos += 4;
                len
            }
            other => {
                return Err(ScriptError::NonPush {
                    opcode: other,
                    position: pos - 1,
                })
            }
        };

        let end = pos
            .checked_add(len)
            .filter(|end| *end <= script.len())
            .ok_or(ScriptError::Truncated(pos))?;
        pushes.push(script[pos..end].to_vec());
        pos = end;
    }

    Ok(pushes)
}

/// Data pushes following OP_RETURN
pub fn op_return_pushes(script_hex: &str) -> Result<Vec<Vec<u8>>, ScriptError> {
    let bytes = hex::decode(script_hex).map_err(|e| ScriptError::Hex(e.to_string()))?;
    match bytes.split_first() {
        Some((&OP_RETURN, rest)) => parse_pushes(rest),
        Some((&opcode, _)) => Err(ScriptError::NonPush {
            opcode,
            position: 0,
        }),
        None => Err(ScriptError::Truncated(0)),
    }
}

/// Public key pushed last by a P2PKH scriptSig (`<sig> <pubkey>`)
pub fn input_script_public_key(input_script_hex: &str) -> Option<String> {
    let bytes = hex::decode(input_script_hex).ok()?;
    let pushes = parse_pushes(&bytes).ok()?;
    pushes
        .last()
        .filter(|key| {
            (key.len() == 33 && matches!(key[0], 0x02 | 0x03)) || (key.len() == 65 && key[0] == 0x04)
        })
        .map(hex::encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "4e532257c01b310b3b5c1fd947c79a72addf8523";

    #[test]
    fn test_hash160_from_p2pkh_and_p2sh() {
        let p2pkh = format!("76a914{}88ac", HASH);
        let p2sh = format!("a914{}87", HASH);
        assert_eq!(output_script_hash160(&p2pkh), Some(HASH));
        assert_eq!(output_script_hash160(&p2sh), Some(HASH));
        assert_eq!(output_script_hash160("6a04007461620568656c6c6f"), None);
    }

    #[test]
    fn test_parse_pushes_with_pushdata1() {
        let mut script = vec![0x04, 0x00, 0x74, 0x61, 0x62, OP_PUSHDATA1, 80];
        script.extend(std::iter::repeat(b'x').take(80));

        let pushes = parse_pushes(&script).unwrap();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0], vec![0x00, 0x74, 0x61, 0x62]);
        assert_eq!(pushes[1].len(), 80);
    }

    #[test]
    fn test_parse_pushes_rejects_truncation_and_opcodes() {
        assert_eq!(parse_pushes(&[0x05, 0x01]), Err(ScriptError::Truncated(1)));
        assert!(matches!(
            parse_pushes(&[0x51]),
            Err(ScriptError::NonPush { opcode: 0x51, .. })
        ));
    }

    #[test]
    fn test_op_return_pushes_requires_op_return() {
        assert!(op_return_pushes("76a914").is_err());
        assert!(op_return_pushes("zz").is_err());
        assert_eq!(
            op_return_pushes("6a0268690100").unwrap(),
            vec![b"hi".to_vec(), vec![0x00]]
        );
    }

    #[test]
    fn test_input_script_public_key() {
        let pubkey = format!("03{}", "ab".repeat(32));
        let sig = "cd".repeat(71);
        let script = format!("47{}21{}", sig, pubkey);
        assert_eq!(input_script_public_key(&script), Some(pubkey));
        assert_eq!(input_script_public_key(""), None);
    }
}
