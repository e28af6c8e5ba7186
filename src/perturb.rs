#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerturbationClass {
    Variant,
    Noise,
    Exact,
}

/// Deterministic for a given `(base_query, index)` pair. The `%5` rule takes
/// precedence over `%7`; the rules never compose.
pub fn perturb(base_query: &str, index: usize) -> String {
    match perturbation_class(index) {
        PerturbationClass::Variant => format!("A variant of {base_query}"),
        PerturbationClass::Noise => base_query.replace('e', "ee").replace('a', "aa"),
        PerturbationClass::Exact => base_query.to_string(),
    }
}

pub fn perturbation_class(index: usize) -> PerturbationClass {
    if index % 5 == 0 {
        PerturbationClass::Variant
    } else if index % 7 == 0 {
        PerturbationClass::Noise
    } else {
        PerturbationClass::Exact
    }
}

#[cfg(test)]
mod tests {
    use super::{perturb, perturbation_class, PerturbationClass};

    #[test]
    fn perturb_is_deterministic() {
        for index in 0..40 {
            assert_eq!(
                perturb("heart attack", index),
                perturb("heart attack", index),
                "index {index} should produce identical output on repeated calls"
            );
        }
    }

    #[test]
    fn multiples_of_five_wrap_the_query() {
        assert_eq!(perturb("Apple", 0), "A variant of Apple");
        assert_eq!(perturb("Apple", 5), "A variant of Apple");
        assert_eq!(perturb("Apple", 10), "A variant of Apple");
    }

    #[test]
    fn five_takes_precedence_over_seven() {
        // 35 is divisible by both; the wrap rule wins and no noise is applied.
        assert_eq!(perturb("heart attack", 35), "A variant of heart attack");
        assert_eq!(perturbation_class(35), PerturbationClass::Variant);
        assert_eq!(perturbation_class(70), PerturbationClass::Variant);
    }

    #[test]
    fn multiples_of_seven_duplicate_vowels() {
        let noisy = perturb("heart attack", 7);
        assert_eq!(noisy, "heeaart aattaack");

        let base = "heart attack";
        let extra = base.chars().filter(|c| *c == 'e' || *c == 'a').count();
        assert_eq!(noisy.len(), base.len() + extra);
    }

    #[test]
    fn noise_rule_is_a_no_op_without_target_vowels() {
        assert_eq!(perturb("London", 7), "London");
        assert_eq!(perturb("", 14), "");
    }

    #[test]
    fn other_indices_pass_through_unchanged() {
        assert_eq!(perturb("Microsoft", 1), "Microsoft");
        assert_eq!(perturb("Microsoft", 3), "Microsoft");
        assert_eq!(perturbation_class(11), PerturbationClass::Exact);
    }
}
