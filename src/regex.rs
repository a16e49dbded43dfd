//! BSON regular expression value (spec §3, §6.1).

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pattern: String,
    /// Option flags, conventionally a subset of `imxslu`. Stored exactly as
    /// given; canonicalizing to ascending code-unit order only happens when
    /// written to the wire (spec §6.1 CString option ordering rule).
    options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Regex {
        Regex {
            pattern: pattern.into(),
            options: options.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    /// Options sorted by ascending Unicode code point, as required when
    /// writing the wire form.
    pub fn sorted_options(&self) -> String {
        let mut chars: Vec<char> = self.options.chars().collect();
        chars.sort_unstable();
        chars.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_options_ascending() {
        let re = Regex::new("^abc$", "xim");
        assert_eq!(re.sorted_options(), "imx");
    }
}
