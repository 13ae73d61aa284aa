//! Output file naming.

/// Characters that are unsafe in file names on common platforms.
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a string safe to use as a file name.
///
/// Each unsafe character becomes `_`, then each run of ASCII whitespace
/// becomes a single `_`. Other Unicode spaces (NBSP, U+3000) are kept. Applying it twice gives the same result as applying it once.
///
/// ```
/// use epub2md::export::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Chapter 1: Intro"), "Chapter_1__Intro");
/// assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;

    for c in name.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        out.push(if UNSAFE_CHARS.contains(&c) { '_' } else { c });
    }

    out
}

/// File name of the `index`-th (0-based) of `count` sections.
///
/// The 1-based number is zero-padded to the number of decimal digits in
/// `count`, so files sort in reading order.
///
/// ```
/// use epub2md::export::section_filename;
///
/// assert_eq!(section_filename(0, 12, "Cover"), "01-Cover.md");
/// assert_eq!(section_filename(11, 12, "The End"), "12-The_End.md");
/// ```
pub fn section_filename(index: usize, count: usize, name: &str) -> String {
    let width = digits(count);
    format!("{:0width$}-{}.md", index + 1, sanitize_filename(name))
}

fn digits(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}
