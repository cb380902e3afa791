use chrono::Local;

/// Split `items` into `k` contiguous chunks of `ceil(n / k)` elements, the
/// last chunk possibly shorter, never larger. Fewer than `k` chunks may be
/// produced when the division does not work out.
pub fn chunk_into<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    if items.is_empty() || k == 0 {
        return Vec::new();
    }
    chunks_of(items, items.len().div_ceil(k))
}

/// Split `items` into contiguous chunks of at most `n` elements.
pub fn chunks_of<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    items.chunks(n).map(|c| c.to_vec()).collect()
}

/// Timestamp used in output file names so reruns never clobber each other.
pub fn run_stamp() -> String {
    Local::now().format("%m.%d.%Y--%H.%M.%S").to_string()
}
