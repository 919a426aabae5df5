//! The live knob store boundary. Like `gov_orchestrator`'s `OverlayInvoker`,
//! this is a narrow trait seam: the canary engine writes and reads through
//! it without knowing whether the backing store is in-process config, a
//! shared-memory table, or an RPC to the running module.

use std::collections::BTreeMap;

use gov_core::value::KnobValue;
use gov_core::{GovResult, KnobName, ModuleId};

pub trait KnobSink {
    fn read(&self, module: &ModuleId, knob: &KnobName) -> Option<KnobValue>;
    fn write(&mut self, module: &ModuleId, knob: &KnobName, value: &KnobValue) -> GovResult<()>;
    fn clear(&mut self, module: &ModuleId, knob: &KnobName) -> GovResult<()>;
}

/// Reference sink for tests and single-process deployments.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKnobSink(BTreeMap<(ModuleId, KnobName), KnobValue>);

impl InMemoryKnobSink {
    pub fn new() -> Self {
        InMemoryKnobSink::default()
    }
}

impl KnobSink for InMemoryKnobSink {
    fn read(&self, module: &ModuleId, knob: &KnobName) -> Option<KnobValue> {
        self.0.get(&(module.clone(), knob.clone())).cloned()
    }

    fn write(&mut self, module: &ModuleId, knob: &KnobName, value: &KnobValue) -> GovResult<()> {
        self.0.insert((module.clone(), knob.clone()), value.clone());
        Ok(())
    }

    fn clear(&mut self, module: &ModuleId, knob: &KnobName) -> GovResult<()> {
        self.0.remove(&(module.clone(), knob.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut sink = InMemoryKnobSink::new();
        let module: ModuleId = "m1".parse().unwrap();
        let knob: KnobName = "batch".parse().unwrap();
        sink.write(&module, &knob, &KnobValue::Int(4)).unwrap();
        assert_eq!(sink.read(&module, &knob), Some(KnobValue::Int(4)));
        sink.clear(&module, &knob).unwrap();
        assert_eq!(sink.read(&module, &knob), None);
    }
}
