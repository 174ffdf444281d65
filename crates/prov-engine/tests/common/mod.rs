#![allow(dead_code)]

use prov_core::{Estimate, Identifier};
use prov_engine::{Engine, EngineConfig};
use prov_graph::{scalar_input, ModuleDescriptor, ModuleFailure, ModuleInputs, ModuleOutputs};

pub fn outputs<const N: usize>(pairs: [(&str, f64); N]) -> ModuleOutputs {
    pairs
        .into_iter()
        .map(|(id, value)| (Identifier::from(id), Estimate::exact(value)))
        .collect()
}

/// `c = a + b`
pub fn sum_module() -> ModuleDescriptor {
    ModuleDescriptor::new("Sum", |inputs: &ModuleInputs| {
        let a = scalar_input(inputs, "a")?;
        let b = scalar_input(inputs, "b")?;
        Ok(outputs([("c", a + b)]))
    })
    .reading(["a", "b"])
    .deriving(["c"])
}

/// `d = c * c`
pub fn square_module() -> ModuleDescriptor {
    ModuleDescriptor::new("Sq", |inputs: &ModuleInputs| {
        let c = scalar_input(inputs, "c")?;
        Ok(outputs([("d", c * c)]))
    })
    .reading(["c"])
    .deriving(["d"])
}

/// Module reading `reads` and writing `writes`, each output the sum of the inputs plus one.
pub fn summing(id: &str, reads: &[&str], writes: &[&str]) -> ModuleDescriptor {
    let read_ids: Vec<String> = reads.iter().map(|id| id.to_string()).collect();
    let write_ids: Vec<String> = writes.iter().map(|id| id.to_string()).collect();
    ModuleDescriptor::new(id, move |inputs: &ModuleInputs| {
        let mut total = 1.0;
        for id in &read_ids {
            total += scalar_input(inputs, id)?;
        }
        Ok(write_ids
            .iter()
            .map(|id| (Identifier::from(id.as_str()), Estimate::exact(total)))
            .collect())
    })
    .reading(reads.iter().copied())
    .deriving(writes.iter().copied())
}

pub fn failing(id: &str, reads: &[&str], writes: &[&str]) -> ModuleDescriptor {
    ModuleDescriptor::new(id, |_: &ModuleInputs| {
        Err(ModuleFailure::new("solver did not converge"))
    })
    .reading(reads.iter().copied())
    .deriving(writes.iter().copied())
}

/// Engine seeded with `a = 2` and `b = 3`.
pub fn seeded_engine(config: EngineConfig) -> Engine {
    let engine = Engine::new(config);
    engine.declare_established("a", 2.0, None).expect("seed a");
    engine.declare_established("b", 3.0, Some(0.1)).expect("seed b");
    engine
}
