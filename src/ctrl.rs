//! The `_QUAY_CMD` control channel.
//!
//! The ctrl client sends action strings to the window manager as a series of
//! ClientMessage events on the root window. Each message carries 20 bytes of
//! data: 19 payload bytes and a trailing opcode byte marking the chunk's
//! place in the stream. The receiver reassembles chunks into a command
//! string and hands it to the action parser.
use crate::{Error, Result};

/// Payload bytes carried per message; the 20th byte is the opcode.
pub const CHUNK_PAYLOAD: usize = 19;

/// Chunk opcodes, carried in the last data byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkOp {
    /// The whole command fits in this message
    Only = 0,
    /// First chunk of a multi-message command
    Start = 1,
    /// Interior chunk
    Middle = 2,
    /// Final chunk
    End = 3,
}

impl TryFrom<u8> for ChunkOp {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(ChunkOp::Only),
            1 => Ok(ChunkOp::Start),
            2 => Ok(ChunkOp::Middle),
            3 => Ok(ChunkOp::End),
            n => Err(Error::InvalidControlOpcode(n)),
        }
    }
}

/// Split a command string into the 20-byte message datas to send.
pub fn encode_command(cmd: &str) -> Vec<[u8; 20]> {
    let bytes = cmd.as_bytes();

    if bytes.len() <= CHUNK_PAYLOAD {
        return vec![chunk(bytes, ChunkOp::Only)];
    }

    let chunks: Vec<&[u8]> = bytes.chunks(CHUNK_PAYLOAD).collect();
    let last = chunks.len() - 1;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let op = if i == 0 {
                ChunkOp::Start
            } else if i == last {
                ChunkOp::End
            } else {
                ChunkOp::Middle
            };
            chunk(c, op)
        })
        .collect()
}

fn chunk(payload: &[u8], op: ChunkOp) -> [u8; 20] {
    let mut data = [0u8; 20];
    data[..payload.len()].copy_from_slice(payload);
    data[CHUNK_PAYLOAD] = op as u8;

    data
}

/// Reassembles chunked control messages into command strings.
///
/// A lone `Start`-less `Middle` or `End` appends to whatever is buffered,
/// matching the tolerant receiver in the original protocol; garbage simply
/// produces an unknown command for the action parser to reject.
#[derive(Debug, Default, Clone)]
pub struct CommandAssembler {
    buf: Vec<u8>,
}

impl CommandAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one 20-byte message, returning the completed command when this
    /// chunk finishes one.
    pub fn push(&mut self, data: &[u8; 20]) -> Result<Option<String>> {
        let op = ChunkOp::try_from(data[CHUNK_PAYLOAD])?;
        let payload = &data[..CHUNK_PAYLOAD];

        match op {
            ChunkOp::Only => {
                self.buf.clear();
                Ok(Some(decode(payload)))
            }
            ChunkOp::Start => {
                self.buf.clear();
                self.buf.extend_from_slice(payload);
                Ok(None)
            }
            ChunkOp::Middle => {
                self.buf.extend_from_slice(payload);
                Ok(None)
            }
            ChunkOp::End => {
                self.buf.extend_from_slice(payload);
                let cmd = decode(&self.buf);
                self.buf.clear();
                Ok(Some(cmd))
            }
        }
    }
}

// payloads shorter than a chunk are NUL padded on the wire
fn decode(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);

    String::from_utf8_lossy(&payload[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn ops(msgs: &[[u8; 20]]) -> Vec<u8> {
        msgs.iter().map(|m| m[CHUNK_PAYLOAD]).collect()
    }

    fn payload_str(msg: &[u8; 20]) -> String {
        decode(&msg[..CHUNK_PAYLOAD])
    }

    #[test]
    fn short_command_is_a_single_only_message() {
        let msgs = encode_command("1 message");

        assert_eq!(msgs.len(), 1);
        assert_eq!(ops(&msgs), vec![0]);
        assert_eq!(payload_str(&msgs[0]), "1 message");
    }

    #[test]
    fn twenty_byte_command_splits_in_two() {
        let msgs = encode_command("2 messages 012345678");

        assert_eq!(msgs.len(), 2);
        assert_eq!(ops(&msgs), vec![1, 3]);
        assert_eq!(payload_str(&msgs[0]), "2 messages 01234567");
        assert_eq!(payload_str(&msgs[1]), "8");
    }

    #[test]
    fn long_command_uses_middle_chunks() {
        let msgs = encode_command("3 messages with extra padding 0123456789");

        assert_eq!(msgs.len(), 3);
        assert_eq!(ops(&msgs), vec![1, 2, 3]);
        assert_eq!(payload_str(&msgs[0]), "3 messages with ext");
        assert_eq!(payload_str(&msgs[1]), "ra padding 01234567");
        assert_eq!(payload_str(&msgs[2]), "89");
    }

    #[test]
    fn forty_five_byte_command_round_trips_as_three_chunks() {
        let cmd = "SendToWorkspace 3 --client 0x2600007 --raise!";
        assert_eq!(cmd.len(), 45);

        let msgs = encode_command(cmd);
        assert_eq!(ops(&msgs), vec![1, 2, 3]);

        let mut asm = CommandAssembler::new();
        assert_eq!(asm.push(&msgs[0]).unwrap(), None);
        assert_eq!(asm.push(&msgs[1]).unwrap(), None);
        assert_eq!(asm.push(&msgs[2]).unwrap(), Some(cmd.to_string()));
    }

    #[test_case("x"; "single byte")]
    #[test_case("1 message"; "short")]
    #[test_case("exactly nineteen by"; "chunk boundary")]
    #[test_case("a longer command string that spans several chunks on the wire"; "long")]
    #[test]
    fn encode_decode_round_trip(cmd: &str) {
        let mut asm = CommandAssembler::new();
        let msgs = encode_command(cmd);

        let mut result = None;
        for m in &msgs {
            result = asm.push(m).unwrap();
        }

        assert_eq!(result, Some(cmd.to_string()));
    }

    #[test]
    fn each_command_yields_exactly_one_result() {
        let mut asm = CommandAssembler::new();
        let msgs = encode_command("a longer command string spanning chunks");

        let results: Vec<_> = msgs
            .iter()
            .map(|m| asm.push(m).unwrap())
            .filter(Option::is_some)
            .collect();

        assert_eq!(results.len(), 1);
    }

    #[test]
    fn invalid_opcode_is_rejected() {
        let mut asm = CommandAssembler::new();
        let mut data = [0u8; 20];
        data[CHUNK_PAYLOAD] = 7;

        assert!(matches!(
            asm.push(&data),
            Err(Error::InvalidControlOpcode(7))
        ));
    }
}
