//! ASCII rendering of peak columns

use super::peaks::Peak;

/// Draw peaks as `height` text rows, top row = +1.0
pub fn render_ascii(peaks: &[Peak], height: usize) -> Vec<String> {
    let h = height.max(4);
    let mut rows = vec![vec![' '; peaks.len()]; h];
    let to_row = |v: f32| -> usize {
        let clamped = v.clamp(-1.0, 1.0);
        ((0.5 - 0.5 * clamped) * (h as f32 - 1.0)).round() as usize
    };

    for (x, peak) in peaks.iter().enumerate() {
        let top = to_row(peak.max);
        let bottom = to_row(peak.min);
        let (a, b) = if top <= bottom { (top, bottom) } else { (bottom, top) };
        for row in rows.iter_mut().take(b + 1).skip(a) {
            row[x] = '#';
        }
    }

    rows.into_iter().map(|row| row.into_iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_column_fills_height() {
        let rows = render_ascii(&[Peak { min: -1.0, max: 1.0 }, Peak { min: 0.0, max: 0.0 }], 5);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.starts_with('#')));
        assert_eq!(rows.iter().filter(|r| r.ends_with('#')).count(), 1);
        assert_eq!(rows[2], "##");
    }
}
