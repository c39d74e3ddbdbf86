//! Luhn checksum used to post-validate credit-card-shaped matches before the
//! redaction engine commits to replacing them. The full card-number catalog
//! (BIN ranges, card-network detection) is out of scope here; this is just
//! the one check the spec calls out by name.

pub(crate) fn passes_luhn(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_visa_test_number() {
        assert!(passes_luhn("4111111111111111"));
    }

    #[test]
    fn rejects_off_by_one_digit() {
        assert!(!passes_luhn("4111111111111112"));
    }
}
