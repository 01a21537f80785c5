//! Property-based testing harness for contract verification.
//!
//! Callers provide seed argument vectors (the interesting cases) and an
//! iteration count. The harness runs every seed, then derives randomized
//! variants of the seeds with a deterministic PRNG and runs each through the
//! [`Weaver`], collecting contract violations with the inputs that caused
//! them.
//!
//! Reproducibility: given the same `random_seed`, the same inputs are
//! generated and the same results are produced.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use deal_core::{ContractKind, Value};

use crate::contracts::ContractViolation;
use crate::error::{ContractError, MethodError};
use crate::weaver::Weaver;

/// Configuration for a property test run.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Seed argument vectors, run first and used as templates for variants.
    pub seeds: Vec<Vec<Value>>,
    /// Number of randomized variants to run.
    pub iterations: u32,
    /// Random seed for reproducibility.
    pub random_seed: u64,
}

/// Result of a property test run.
#[derive(Debug, Clone)]
pub struct PropertyTestResult {
    /// Total cases run (seeds + random variants).
    pub total_run: u32,
    pub passed: u32,
    /// Cases rejected by a precondition. These are inputs outside the
    /// method's domain, not failures.
    pub discarded: u32,
    pub failures: Vec<PropertyTestFailure>,
    /// The random seed used.
    pub random_seed: u64,
}

/// A failing case with its counterexample inputs.
#[derive(Debug, Clone)]
pub struct PropertyTestFailure {
    pub inputs: Vec<Value>,
    pub violations: Vec<ContractViolation>,
}

/// Derives a random variant of `seed`.
///
/// Scalars are replaced by a boundary value ~30% of the time and otherwise
/// perturbed around the seed. Lists and objects are varied element-wise; a
/// list is occasionally emptied.
pub fn generate_variant(seed: &Value, rng: &mut ChaCha8Rng) -> Value {
    match seed {
        Value::Null => Value::Null,

        Value::Bool(_) => Value::Bool(rng.gen_bool(0.5)),

        Value::Int(i) => {
            if rng.gen_ratio(3, 10) {
                let boundaries: &[i64] = &[0, 1, -1, i64::MIN, i64::MAX];
                Value::Int(boundaries[rng.gen_range(0..boundaries.len())])
            } else {
                Value::Int(i.saturating_add(rng.gen_range(-1000..=1000)))
            }
        }

        Value::Float(f) => {
            if rng.gen_ratio(3, 10) {
                let boundaries: &[f64] = &[0.0, -0.0, 1.0, -1.0];
                Value::Float(boundaries[rng.gen_range(0..boundaries.len())])
            } else {
                Value::Float(f + rng.gen_range(-1e3f64..1e3f64))
            }
        }

        Value::Str(s) => {
            if rng.gen_ratio(3, 10) {
                let boundaries: &[&str] = &["", " ", "0"];
                Value::Str(boundaries[rng.gen_range(0..boundaries.len())].to_string())
            } else {
                let keep = rng.gen_range(0..=s.chars().count());
                Value::Str(s.chars().take(keep).collect())
            }
        }

        Value::List(items) => {
            if rng.gen_ratio(1, 10) {
                Value::List(Vec::new())
            } else {
                Value::List(items.iter().map(|item| generate_variant(item, rng)).collect())
            }
        }

        Value::Object(obj) => {
            let mut variant = obj.clone();
            for value in variant.fields.values_mut() {
                *value = generate_variant(value, rng);
            }
            Value::Object(variant)
        }
    }
}

/// Derives a variant of every argument in a seed vector.
pub fn generate_inputs(seed: &[Value], rng: &mut ChaCha8Rng) -> Vec<Value> {
    seed.iter().map(|value| generate_variant(value, rng)).collect()
}

/// Runs property tests on `class::method`.
///
/// Each case gets a fresh copy of `receiver`. Seeds are run first, then
/// `iterations` variants, each derived from the seeds in round-robin order.
/// A case passes when the call returns normally. A precondition violation
/// discards the case. Failures of the body itself are not contract
/// violations and count as passes. Metadata errors abort the run.
pub fn run_property_tests<F>(
    weaver: &Weaver<'_>,
    class: &str,
    method: &str,
    receiver: Option<&Value>,
    mut body: F,
    config: PropertyTestConfig,
) -> Result<PropertyTestResult, ContractError>
where
    F: FnMut(Option<&mut Value>, &[Value]) -> Result<Value, MethodError>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
    let mut result = PropertyTestResult {
        total_run: 0,
        passed: 0,
        discarded: 0,
        failures: Vec::new(),
        random_seed: config.random_seed,
    };

    let mut cases: Vec<Vec<Value>> = config.seeds.clone();
    if !config.seeds.is_empty() {
        for i in 0..config.iterations as usize {
            let seed = &config.seeds[i % config.seeds.len()];
            cases.push(generate_inputs(seed, &mut rng));
        }
    }

    for inputs in cases {
        result.total_run += 1;
        let mut this = receiver.cloned();
        match weaver.call(class, method, this.as_mut(), inputs.clone(), &mut body) {
            Ok(_) => result.passed += 1,
            Err(ContractError::Violated(report)) => {
                if report
                    .first()
                    .is_some_and(|v| v.kind == ContractKind::Precondition)
                {
                    result.discarded += 1;
                } else {
                    result.failures.push(PropertyTestFailure {
                        inputs,
                        violations: report.violations,
                    });
                }
            }
            Err(ContractError::MethodFailed { method, source }) => {
                tracing::trace!(%method, %source, "method failed; not a contract violation");
                result.passed += 1;
            }
            Err(err @ ContractError::Metadata(_)) => return Err(err),
        }
    }

    tracing::debug!(
        total = result.total_run,
        passed = result.passed,
        discarded = result.discarded,
        failures = result.failures.len(),
        "property test run finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerConfig;
    use deal_core::{ClassKind, ClassRegistry, Object, Param};

    /// `Math::halve(n)` requires `$n >= 0` and ensures `$__result * 2 == $n`,
    /// which odd inputs break.
    fn math() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        let class = reg.add_class("Math", ClassKind::Class, true).unwrap();
        let halve = reg.add_method(class, "halve", [Param::new("n")]).unwrap();
        reg.add_contract(halve, ContractKind::Precondition, "$n >= 0").unwrap();
        reg.add_contract(halve, ContractKind::Postcondition, "$__result * 2 == $n").unwrap();
        reg
    }

    fn halve(_: Option<&mut Value>, args: &[Value]) -> Result<Value, MethodError> {
        match args {
            [Value::Int(n)] => Ok(Value::Int(n / 2)),
            _ => Err("halve expects one int".into()),
        }
    }

    fn config(seeds: Vec<Vec<Value>>, iterations: u32) -> PropertyTestConfig {
        PropertyTestConfig {
            seeds,
            iterations,
            random_seed: 42,
        }
    }

    #[test]
    fn variants_keep_the_seed_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let seed = Value::Object(
            Object::new("Point")
                .with_field("x", 1)
                .with_field("label", "origin")
                .with_field("tags", Value::List(vec![Value::Bool(true)])),
        );
        for _ in 0..50 {
            let variant = generate_variant(&seed, &mut rng);
            let obj = variant.as_object().expect("object stays an object");
            assert_eq!(obj.class, "Point");
            assert_eq!(obj.field("x").map(Value::type_name), Some("int"));
            assert_eq!(obj.field("label").map(Value::type_name), Some("string"));
            assert_eq!(obj.field("tags").map(Value::type_name), Some("list"));
        }
    }

    #[test]
    fn finds_violations_on_odd_inputs() {
        let reg = math();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let result = run_property_tests(
            &weaver,
            "Math",
            "halve",
            None,
            halve,
            config(vec![vec![Value::Int(4)], vec![Value::Int(3)]], 200),
        )
        .unwrap();

        assert_eq!(result.total_run, 202);
        assert_eq!(
            result.passed + result.discarded + result.failures.len() as u32,
            result.total_run
        );
        // The odd seed fails deterministically and is reported first.
        assert_eq!(result.failures[0].inputs, vec![Value::Int(3)]);
        assert!(result
            .failures
            .iter()
            .all(|f| f.violations[0].kind == ContractKind::Postcondition));
        assert!(result.discarded > 0, "boundary values include negatives");
    }

    #[test]
    fn runs_are_reproducible() {
        let reg = math();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let run = || {
            run_property_tests(
                &weaver,
                "Math",
                "halve",
                None,
                halve,
                config(vec![vec![Value::Int(10)]], 100),
            )
            .unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.passed, b.passed);
        assert_eq!(a.discarded, b.discarded);
        let inputs = |r: &PropertyTestResult| -> Vec<Vec<Value>> {
            r.failures.iter().map(|f| f.inputs.clone()).collect()
        };
        assert_eq!(inputs(&a), inputs(&b));
    }

    #[test]
    fn all_seeds_pass_when_valid() {
        let reg = math();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let seeds = vec![vec![Value::Int(0)], vec![Value::Int(2)], vec![Value::Int(100)]];
        let result =
            run_property_tests(&weaver, "Math", "halve", None, halve, config(seeds, 0)).unwrap();
        assert_eq!(result.total_run, 3);
        assert_eq!(result.passed, 3);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn body_failures_are_not_contract_failures() {
        let reg = math();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let result = run_property_tests(
            &weaver,
            "Math",
            "halve",
            None,
            |_: Option<&mut Value>, _: &[Value]| Err("boom".into()),
            config(vec![vec![Value::Int(2)]], 0),
        )
        .unwrap();
        assert_eq!(result.passed, 1);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn unknown_methods_abort_the_run() {
        let reg = math();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let err = run_property_tests(
            &weaver,
            "Math",
            "double",
            None,
            halve,
            config(vec![vec![Value::Int(1)]], 5),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Metadata(_)));
    }
}
