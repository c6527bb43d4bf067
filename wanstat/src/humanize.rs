/// Human-readable durations: 93784 seconds is "1d 2h 3m 4s".
///
/// Units run years/weeks/days/hours/minutes/seconds with a 52-week year; zero-valued leading
/// units are omitted but the seconds part is always printed, so a zero duration is "0s".

pub fn duration_formatted(seconds: f64) -> String {
    const PARTS: [(&str, u64); 5] = [
        ("y", 60 * 60 * 24 * 7 * 52),
        ("w", 60 * 60 * 24 * 7),
        ("d", 60 * 60 * 24),
        ("h", 60 * 60),
        ("m", 60),
    ];

    let mut rest = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let mut time = vec![];
    for (suffix, length) in PARTS {
        let value = rest / length;
        if value > 0 {
            time.push(format!("{value}{suffix}"));
            rest %= length;
        }
    }
    time.push(format!("{rest}s"));
    time.join(" ")
}

#[test]
fn test_duration_formatted() {
    assert_eq!(duration_formatted(0.0), "0s");
    assert_eq!(duration_formatted(59.0), "59s");
    assert_eq!(duration_formatted(60.0), "1m 0s");
    assert_eq!(duration_formatted(3661.0), "1h 1m 1s");
    assert_eq!(duration_formatted(93784.0), "1d 2h 3m 4s");
    assert_eq!(duration_formatted((60 * 60 * 24 * 7 * 52) as f64 + 1.0), "1y 1s");
    // Nonsense inputs clamp to zero rather than panic.
    assert_eq!(duration_formatted(-5.0), "0s");
    assert_eq!(duration_formatted(f64::NAN), "0s");
}
