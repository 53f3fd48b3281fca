/// Extracts the completion fraction from a yt-dlp `[download]` status line.
///
/// yt-dlp prints lines such as `[download]  42.3% of ~ 10.00MiB at 1.2MiB/s ETA 00:05`.
/// Returns a value in `0.0..=1.0`, or `None` for any other line.
pub fn parse_progress_from_line(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix("[download]")?;
    let token = rest.split_whitespace().next()?;
    let number = token.strip_suffix('%')?;
    let value = number.parse::<f32>().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percentage_lines() {
        let pct = parse_progress_from_line("[download]  42.5% of ~ 10.00MiB at 1.20MiB/s ETA 00:05");
        assert_eq!(pct, Some(0.425));
        assert_eq!(parse_progress_from_line("[download] 100% of 3.10MiB in 00:02"), Some(1.0));
    }

    #[test]
    fn ignores_other_output() {
        assert_eq!(parse_progress_from_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_progress_from_line("[download] Destination: downloads/x.mp4"), None);
        assert_eq!(parse_progress_from_line("ERROR: unable to download"), None);
    }
}
