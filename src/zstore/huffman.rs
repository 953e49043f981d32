//! Huffman codebook over the delta alphabet {0..=63, EOF}.
//!
//! Symbols are the leading-zero counts of XORs between adjacent sorted
//! values, plus one EOF marker per block. The codebook lives only in
//! memory next to the compressed bytes, so there is no canonical-form or
//! serialization concern; it just has to decode what it encoded.

use super::bits::{BitReader, BitWriter};

/// Leading-zero symbols 0..=63; EOF terminates a block.
pub const EOF_SYMBOL: u16 = 64;

const ALPHABET: usize = EOF_SYMBOL as usize + 1;

#[derive(Debug, Clone, Copy, Default)]
struct Code {
    bits: u64,
    len: u8,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(u16),
    Branch { zero: u16, one: u16 },
}

/// An encode table plus a decode tree for the fixed 65-symbol alphabet.
#[derive(Debug, Clone)]
pub struct Codebook {
    codes: [Code; ALPHABET],
    nodes: Vec<Node>,
    root: u16,
}

impl Codebook {
    /// Build from the observed counts of the 64 leading-zero symbols.
    ///
    /// Every symbol is weighted `count + 1` so all symbols, including EOF
    /// and never-seen deltas, receive a code; unambiguous decoding then
    /// never depends on which deltas happened to occur.
    pub fn from_counts(counts: &[u64; 64]) -> Self {
        let mut nodes: Vec<Node> = (0..ALPHABET as u16).map(Node::Leaf).collect();

        // (weight, node index); ties broken by index for determinism.
        let mut heap: std::collections::BinaryHeap<std::cmp::Reverse<(u64, u16)>> = (0..ALPHABET)
            .map(|s| {
                let w = counts.get(s).copied().unwrap_or(0) + 1;
                std::cmp::Reverse((w, s as u16))
            })
            .collect();

        let mut root = 0;
        while let Some(std::cmp::Reverse((wa, a))) = heap.pop() {
            let Some(std::cmp::Reverse((wb, b))) = heap.pop() else {
                root = a;
                break;
            };
            let idx = nodes.len() as u16;
            nodes.push(Node::Branch { zero: a, one: b });
            heap.push(std::cmp::Reverse((wa + wb, idx)));
        }

        let mut codes = [Code::default(); ALPHABET];
        assign_codes(&nodes, root, 0, 0, &mut codes);

        Self { codes, nodes, root }
    }

    /// Code length in bits for `sym`.
    pub fn symbol_len(&self, sym: u16) -> usize {
        self.codes[sym as usize].len as usize
    }

    pub fn encode(&self, w: &mut BitWriter, sym: u16) {
        let code = self.codes[sym as usize];
        w.write_bits(code.bits, u32::from(code.len));
    }

    /// Walk the tree one bit at a time; `None` if the stream runs dry
    /// before reaching a leaf.
    pub fn decode(&self, r: &mut BitReader<'_>) -> Option<u16> {
        let mut at = self.root;
        loop {
            match self.nodes[at as usize] {
                Node::Leaf(sym) => return Some(sym),
                Node::Branch { zero, one } => {
                    at = if r.read_bit()? { one } else { zero };
                }
            }
        }
    }
}

fn assign_codes(nodes: &[Node], at: u16, bits: u64, len: u8, codes: &mut [Code; ALPHABET]) {
    match nodes[at as usize] {
        Node::Leaf(sym) => {
            // 65 leaves guarantee at least one branch above every leaf.
            codes[sym as usize] = Code { bits, len };
        }
        Node::Branch { zero, one } => {
            assign_codes(nodes, zero, bits << 1, len + 1, codes);
            assign_codes(nodes, one, (bits << 1) | 1, len + 1, codes);
        }
    }
}
