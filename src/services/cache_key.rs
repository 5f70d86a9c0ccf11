//! Stable cache-key derivation.
//!
//! Keys are a 32-bit rolling hash (`h = (h << 5) - h + unit`, wrapped to the
//! signed 32-bit range at each step) over the UTF-16 code units of the
//! serialized input, rendered as the absolute value in base 36. Strings hash
//! as-is; anything else is serialized to JSON first. `serde_json` maps are
//! ordered, so structurally equal values always produce the same key.
//!
//! Collisions are possible. Correctness only depends on the key being stable.

use serde::Serialize;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fallback serialization for inputs that cannot be turned into JSON.
const UNSERIALIZABLE: &str = "null";

/// Derive a stable key for any serializable value.
pub fn cache_key<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => hash_str(&s),
        Ok(other) => hash_str(&other.to_string()),
        Err(err) => {
            tracing::debug!(error = %err, "cache key input not serializable, hashing placeholder");
            hash_str(UNSERIALIZABLE)
        }
    }
}

/// Join a domain prefix and the hashed value: `{prefix}_{hash}`.
pub fn prefixed_key<T: Serialize + ?Sized>(prefix: &str, value: &T) -> String {
    format!("{prefix}_{}", cache_key(value))
}

/// Hash a string directly.
pub fn hash_str(input: &str) -> String {
    let hash = input.encode_utf16().fold(0_i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_hash_values() {
        assert_eq!(hash_str(""), "0");
        // 'a' = 97 = 2 * 36 + 25
        assert_eq!(hash_str("a"), "2p");
        // 97 * 31 + 98 = 3105
        assert_eq!(hash_str("ab"), "2e9");
    }

    #[test]
    fn test_strings_hash_without_quotes() {
        assert_eq!(cache_key("ab"), hash_str("ab"));
        assert_ne!(cache_key("ab"), hash_str("\"ab\""));
    }

    #[test]
    fn test_structured_values_hash_by_content() {
        let a = json!({"type": "object", "required": ["id"]});
        let b = json!({"required": ["id"], "type": "object"});
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_ne!(cache_key(&a), cache_key(&json!({"type": "array"})));
    }

    #[test]
    fn test_wrapping_keeps_result_non_negative_base36() {
        let long = "x".repeat(10_000);
        let key = hash_str(&long);
        assert!(!key.is_empty());
        assert!(key.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(key, hash_str(&long));
    }

    #[test]
    fn test_i32_min_is_rendered_as_positive() {
        assert_eq!(to_base36(u64::from(i32::MIN.unsigned_abs())), "zik0zk");
    }

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed_key("schema", "a"), "schema_2p");
    }
}
