use super::model::ClassCounts;

/// Tally the labels that can sit at a window centre.
///
/// Rows and columns closer than `window / 2` to any edge are skipped, the same
/// positions [`super::window::LabelWindows`] never yields. A trailing partial
/// row is ignored.
pub fn count(samples: &[u8], row_width: usize, window: usize) -> ClassCounts {
    let mut counts = ClassCounts::new();
    if row_width == 0 {
        return counts;
    }
    let half = window / 2;
    let height = samples.len() / row_width;
    if row_width < window || height < window {
        return counts;
    }

    for row in samples
        .chunks_exact(row_width)
        .skip(half)
        .take(height - 2 * half)
    {
        for &label in &row[half..row_width - half] {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    counts
}
