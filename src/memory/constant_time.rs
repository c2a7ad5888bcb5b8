/*!
Constant-time comparison.
*/

/// Compare two byte slices in constant time.
///
/// Runs over every byte regardless of where the slices differ. Slices of
/// different lengths compare unequal immediately; lengths are not secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
