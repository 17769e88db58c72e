/// Tenant codes embedded in email domains
///
/// `jane@t0001.com` belongs to tenant `T0001`: the code is whatever sits
/// between the `@` and the last `.` of the address.

/// Width numeric suffixes are zero-padded to
const SUFFIX_WIDTH: usize = 4;

/// Raw tenant code from an email address, if it has one
pub fn extract_tenant_code(email: &str) -> Option<&str> {
    let (_, domain) = email.trim().split_once('@')?;
    let (code, _) = domain.rsplit_once('.')?;
    let code = code.trim();
    (!code.is_empty()).then_some(code)
}

/// Canonical form of a tenant code
///
/// A letter prefix followed by digits becomes the upper-cased prefix plus
/// the number padded to four digits (`t00001` → `T0001`). Anything else is
/// returned trimmed and unchanged.
pub fn normalize_tenant_code(code: &str) -> String {
    let code = code.trim();
    let split = code
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(code.len());
    let (prefix, digits) = code.split_at(split);

    let well_formed = !prefix.is_empty()
        && !digits.is_empty()
        && prefix.chars().all(|c| c.is_ascii_alphabetic())
        && digits.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return code.to_string();
    }

    let significant = digits.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };
    format!(
        "{}{:0>width$}",
        prefix.to_ascii_uppercase(),
        significant,
        width = SUFFIX_WIDTH
    )
}

/// Normalized tenant code from an email address
pub fn tenant_code_from_email(email: &str) -> Option<String> {
    extract_tenant_code(email).map(normalize_tenant_code)
}
