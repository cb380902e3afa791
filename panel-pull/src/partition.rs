use panel_pull_common::chunk_into;

/// Assign contiguous target chunks to workers, at most one per available
/// credential. Fewer targets than credentials degrades to a single chunk
/// so no worker spins up with nothing to do.
pub fn assign(targets: &[String], width: usize) -> Vec<Vec<String>> {
    if targets.is_empty() || width == 0 {
        return Vec::new();
    }
    if targets.len() < width {
        return vec![targets.to_vec()];
    }
    chunk_into(targets, width)
}
