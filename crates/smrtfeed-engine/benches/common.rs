// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use smrtfeed_engine::{Patch, PatchLog};

#[allow(dead_code)]
pub fn generate_baseline(sentences: usize) -> String {
    "The quick brown fox jumps over the lazy dog. ".repeat(sentences)
}

/// One replacement of "quick" per sentence
#[allow(dead_code)]
pub fn generate_log(sentences: usize) -> PatchLog {
    let baseline = generate_baseline(sentences);
    let sentence_len = baseline.len() / sentences.max(1);
    let patches = (0..sentences).map(|i| {
        let start = i * sentence_len + 4;
        Patch::new(start, start + 5, "slow")
    });
    let (log, _) = PatchLog::from_patches(baseline, patches);
    log
}
