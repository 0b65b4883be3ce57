//! Fallback text splitter for oversized sections
//!
//! Tries a prioritized separator list (paragraph breaks, line breaks,
//! sentence boundaries, spaces) and uses the first whose fragments all fit
//! the size budget, then merges fragments back into chunks with a fixed
//! overlap carried between consecutive chunks. Text with no usable
//! separator is cut at raw character boundaries.

/// Separators in priority order; the empty string means a raw cut
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    max_chars: usize,
    overlap_chars: usize,
}

impl RecursiveSplitter {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Splits text into pieces of at most `max_chars`
    ///
    /// Consecutive pieces share up to `overlap_chars` of trailing text so
    /// that no semantic unit is entirely lost at a cut point. Text already
    /// within budget is returned unchanged as a single piece.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.len() <= self.max_chars {
            return vec![text.to_string()];
        }

        for separator in SEPARATORS {
            if separator.is_empty() {
                return self.hard_split(text);
            }
            let fragments: Vec<&str> = text.split_inclusive(separator).collect();
            if fragments.iter().all(|f| f.len() <= self.max_chars) {
                return self.merge_fragments(fragments);
            }
        }

        self.hard_split(text)
    }

    /// Reassembles fragments into budget-sized chunks with overlap
    ///
    /// Overlap is carried at fragment granularity: when a chunk closes, its
    /// trailing fragments totalling at most `overlap_chars` seed the next
    /// chunk. A seed that leaves no room for the incoming fragment is
    /// shrunk from the front rather than emitted as a chunk of its own.
    fn merge_fragments(&self, fragments: Vec<&str>) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut window_len = 0usize;
        let mut new_in_window = 0usize;

        for fragment in fragments {
            while !window.is_empty() && window_len + fragment.len() > self.max_chars {
                if new_in_window == 0 {
                    let removed = window.remove(0);
                    window_len -= removed.len();
                } else {
                    chunks.push(window.concat());
                    let (seed, seed_len) = self.overlap_seed(&window);
                    window = seed;
                    window_len = seed_len;
                    new_in_window = 0;
                }
            }
            window_len += fragment.len();
            window.push(fragment);
            new_in_window += 1;
        }

        if new_in_window > 0 {
            chunks.push(window.concat());
        }
        chunks
    }

    /// Trailing fragments of a closed window totalling at most the overlap
    fn overlap_seed<'a>(&self, window: &[&'a str]) -> (Vec<&'a str>, usize) {
        let mut seed = Vec::new();
        let mut seed_len = 0usize;
        for fragment in window.iter().rev() {
            if seed_len + fragment.len() > self.overlap_chars {
                break;
            }
            seed_len += fragment.len();
            seed.push(*fragment);
        }
        seed.reverse();
        (seed, seed_len)
    }

    /// Raw cut at character boundaries, advancing by max minus overlap
    fn hard_split(&self, text: &str) -> Vec<String> {
        let step = self.max_chars.saturating_sub(self.overlap_chars).max(1);
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = floor_boundary(text, start + self.max_chars);
            chunks.push(text[start..end].to_string());
            if end >= text.len() {
                break;
            }
            start = ceil_boundary(text, start + step);
            if start >= text.len() {
                break;
            }
        }
        chunks
    }
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
