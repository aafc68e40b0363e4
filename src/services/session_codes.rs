use rand::Rng;

/// No `0/O` or `1/I` so codes survive being read aloud or copied by hand.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MIN_ACCEPTED_LEN: usize = 4;
const MAX_ACCEPTED_LEN: usize = 16;

pub(crate) fn generate_session_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(len);
    for _ in 0..len {
        let index = rng.gen_range(0..ALPHABET.len());
        output.push(ALPHABET[index] as char);
    }
    output
}

/// Canonical form of a user-typed code: separators dropped, upper-cased.
/// Returns `None` when the input cannot be a session code at all.
pub(crate) fn normalize_session_code(raw: &str) -> Option<String> {
    let normalized = raw
        .chars()
        .filter(|ch| !matches!(ch, '-' | ' ' | '_'))
        .map(|ch| ch.to_ascii_uppercase())
        .collect::<String>();

    let valid_len = (MIN_ACCEPTED_LEN..=MAX_ACCEPTED_LEN).contains(&normalized.len());
    if valid_len && normalized.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        Some(normalized)
    } else {
        None
    }
}
