//! Interactive prompt helpers and a dependency-free timestamp

use std::io::{self, Write};
use std::str::FromStr;

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buffer = String::new();
    if io::stdin().read_line(&mut buffer).is_err() {
        return String::new();
    }
    buffer.trim().to_string()
}

/// Ask until the answer parses; empty input takes `default`
pub fn get_or_default<T: FromStr + Copy>(prompt: &str, default: T) -> T {
    loop {
        let answer = read_line(prompt);
        if answer.is_empty() {
            return default;
        }
        match answer.parse::<T>() {
            Ok(v) => return v,
            Err(_) => println!("Invalid number."),
        }
    }
}

pub fn get_bool(prompt: &str) -> bool {
    loop {
        match read_line(&format!("{} (y/n): ", prompt)).to_lowercase().as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => println!("Please type 'y' or 'n'."),
        }
    }
}

pub fn get_string(prompt: &str) -> String {
    read_line(prompt)
}

/// Numbered menu; returns the 0-based index of the chosen option
pub fn get_choice(prompt: &str, options: &[&str]) -> usize {
    loop {
        println!("{}", prompt);
        for (i, opt) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, opt);
        }
        if let Ok(num) = read_line("Select: ").parse::<usize>() {
            if (1..=options.len()).contains(&num) {
                return num - 1;
            }
        }
        println!("Invalid choice.");
    }
}

/// UTC timestamp `YYYY-MM-DD HH:MM UTC` from the system clock
pub fn chrono_lite() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    format!("{}-{:02}-{:02} {:02}:{:02} UTC", year, month, day, (secs % 86_400) / 3600, (secs % 3600) / 60)
}

/// Days since 1970-01-01 to (year, month, day)
fn civil_from_days(mut days: i64) -> (i64, u32, i64) {
    let mut year = 1970;
    loop {
        let len = if is_leap_year(year) { 366 } else { 365 };
        if days < len {
            break;
        }
        days -= len;
        year += 1;
    }
    let feb = if is_leap_year(year) { 29 } else { 28 };
    let months = [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1;
    for len in months {
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }
    (year, month, days + 1)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(59), (1970, 3, 1));
        // 2000-02-29
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = chrono_lite();
        assert!(ts.ends_with(" UTC"));
        assert_eq!(ts.len(), "2024-01-01 00:00 UTC".len());
    }
}
