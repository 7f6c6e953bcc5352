//! Serializes a minimised [`Dfa`] into the self-describing byte image the matcher
//! walks directly, and validates/parses that image back into its header fields.

use log::trace;

use super::dfa::Dfa;
use super::ids::DfaId;
use crate::errors::{RedError, Result};
use crate::format::Format;
use crate::stats::CompileStats;

const MAGIC: &[u8; 4] = b"REDA";
const VERSION_MAJOR: u16 = 1;
const VERSION_MINOR: u16 = 0;
const HEADER_FIXED_LEN: usize = 24 + 256;

fn write_uint(dst: &mut [u8], value: u64, width: usize) {
    for (i, byte) in dst.iter_mut().enumerate().take(width) {
        *byte = ((value >> (8 * i)) & 0xff) as u8;
    }
}

fn read_uint(src: &[u8], width: usize) -> u64 {
    let mut value = 0u64;
    for (i, &byte) in src.iter().enumerate().take(width) {
        value |= (byte as u64) << (8 * i);
    }
    value
}

fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut h = OFFSET;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(PRIME);
    }
    h
}

/// Smallest legal width in `{1,2,4}`, or the explicitly requested one if it still fits.
fn select_width(format: Format, max_result: u32, num_states: u32, max_char: u32) -> Result<u8> {
    let fits = |width: u8| -> bool {
        let bits = width as u32 * 8;
        let result_fits = (max_result as u64) < (1u64 << (bits - 1));
        let table_size = (num_states as u64) * (max_char as u64 + 1) * (width as u64);
        let offset_fits = table_size < (1u64 << bits);
        result_fits && offset_fits
    };
    match format {
        Format::Width1 | Format::Width2 | Format::Width4 => {
            let width = format.width_bytes();
            if fits(width) {
                Ok(width)
            } else {
                Err(RedError::limit(format!(
                    "requested entry width {} is too small for this automaton",
                    width
                )))
            }
        }
        Format::Auto => [1u8, 2, 4]
            .into_iter()
            .find(|&w| fits(w))
            .ok_or_else(|| RedError::limit("automaton too large for any entry width")),
    }
}

/// Serialize `dfa` (already minimised, with its equivalence map installed) into a
/// self-describing byte image, optionally anchored by a fixed `leader` prefix
/// (already translated into equivalence-class space by the caller).
pub(crate) fn serialize(
    dfa: &Dfa,
    leader: &[u8],
    format: Format,
    stats: Option<&mut CompileStats>,
) -> Result<Vec<u8>> {
    if leader.len() > u8::MAX as usize {
        return Err(RedError::limit("leader prefix longer than 255 bytes"));
    }
    let num_states = dfa.len() as u32;
    let max_char = dfa.find_max_char();
    let max_result = dfa.find_max_result();
    let width = select_width(format, max_result, num_states, max_char)?;
    let width_u = width as usize;

    trace!(
        "serializer::serialize {} states, width {}, max_char {}",
        num_states,
        width,
        max_char
    );

    let entries_per_state = 1 + (max_char as usize + 1);
    let record_size = width_u * entries_per_state;
    let mut table = vec![0u8; record_size * num_states as usize];
    for s in 0..num_states {
        let id = DfaId::new(s);
        let state = dfa.state(id);
        let base = s as usize * record_size;
        let bits = width_u * 8;
        let mut entry = state.result as u64;
        if state.dead_end {
            entry |= 1u64 << (bits - 1);
        }
        write_uint(&mut table[base..base + width_u], entry, width_u);
        for c in 0..=max_char {
            let target = dfa.next(id, c);
            let target_off = target.id() as usize * record_size;
            let stored = (target_off / width_u) as u64;
            let pos = base + width_u + c as usize * width_u;
            write_uint(&mut table[pos..pos + width_u], stored, width_u);
        }
    }

    let equiv_map = dfa.equiv_map.unwrap_or_else(|| {
        let mut identity = [0u8; 256];
        for (i, b) in identity.iter_mut().enumerate() {
            *b = i as u8;
        }
        identity
    });

    let before_pad = HEADER_FIXED_LEN + leader.len();
    let pad = (8 - before_pad % 8) % 8;
    let initial_off = dfa.initial().id() as usize * record_size;

    let mut out = Vec::with_capacity(before_pad + pad + table.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION_MAJOR.to_le_bytes());
    out.extend_from_slice(&VERSION_MINOR.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // checksum placeholder
    out.push(width);
    out.push(max_char as u8);
    out.push(leader.len() as u8);
    out.push(0); // pad byte
    out.extend_from_slice(&num_states.to_le_bytes());
    out.extend_from_slice(&(initial_off as u32).to_le_bytes());
    out.extend_from_slice(&equiv_map);
    out.extend_from_slice(leader);
    out.extend(std::iter::repeat(0u8).take(pad));
    out.extend_from_slice(&table);

    let checksum = fnv1a32(&out[12..]);
    out[8..12].copy_from_slice(&checksum.to_le_bytes());

    if let Some(s) = stats {
        s.serialized_bytes = out.len() as u64;
    }
    Ok(out)
}

/// Parsed, validated view into a serialized image's fixed-size header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub(crate) width: u8,
    pub(crate) max_char: u8,
    pub(crate) leader_len: u8,
    pub(crate) state_cnt: u32,
    pub(crate) initial_off: u32,
    pub(crate) equiv_map: [u8; 256],
    pub(crate) leader_start: usize,
    pub(crate) table_start: usize,
}

impl Header {
    pub(crate) fn record_size(&self) -> usize {
        self.width as usize * (1 + self.max_char as usize + 1)
    }
}

/// Validate magic, version, and checksum, then parse the header fields.
/// Must run before any state record in `bytes` is trusted.
pub(crate) fn check_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_FIXED_LEN {
        return Err(RedError::exec("serialized image shorter than the header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(RedError::exec("bad magic in serialized image"));
    }
    let major = u16::from_le_bytes([bytes[4], bytes[5]]);
    if major != VERSION_MAJOR {
        return Err(RedError::exec(format!(
            "unsupported major version {}",
            major
        )));
    }
    let stored_checksum = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let computed = fnv1a32(&bytes[12..]);
    if stored_checksum != computed {
        return Err(RedError::exec("checksum mismatch in serialized image"));
    }
    let width = bytes[12];
    if width != 1 && width != 2 && width != 4 {
        return Err(RedError::exec(format!("unsupported entry width {}", width)));
    }
    let max_char = bytes[13];
    let leader_len = bytes[14];
    let state_cnt = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let initial_off = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let mut equiv_map = [0u8; 256];
    equiv_map.copy_from_slice(&bytes[24..280]);
    let leader_start = HEADER_FIXED_LEN;
    let before_pad = HEADER_FIXED_LEN + leader_len as usize;
    let pad = (8 - before_pad % 8) % 8;
    let table_start = before_pad + pad;

    let header = Header {
        width,
        max_char,
        leader_len,
        state_cnt,
        initial_off,
        equiv_map,
        leader_start,
        table_start,
    };
    let expected_len = table_start + header.record_size() * state_cnt as usize;
    if bytes.len() < expected_len {
        return Err(RedError::exec("serialized image truncated before state table ends"));
    }
    Ok(header)
}

/// Read one state's `(result, dead_end)` pair at `state_off` (byte offset within
/// the state table, i.e. relative to `header.table_start`).
pub(crate) fn read_entry(bytes: &[u8], header: &Header, state_off: usize) -> (u32, bool) {
    let width = header.width as usize;
    let base = header.table_start + state_off;
    let raw = read_uint(&bytes[base..base + width], width);
    let bits = width * 8;
    let dead_end = raw & (1u64 << (bits - 1)) != 0;
    let result = (raw & ((1u64 << (bits - 1)) - 1)) as u32;
    (result, dead_end)
}

/// Read the byte offset (within the state table) of the target state reached from
/// the state at `state_off` on class `class`.
pub(crate) fn read_transition(bytes: &[u8], header: &Header, state_off: usize, class: u8) -> usize {
    let width = header.width as usize;
    let base = header.table_start + state_off + width + class as usize * width;
    let stored = read_uint(&bytes[base..base + width], width);
    stored as usize * width
}

pub(crate) fn leader_bytes<'a>(bytes: &'a [u8], header: &Header) -> &'a [u8] {
    &bytes[header.leader_start..header.leader_start + header.leader_len as usize]
}
