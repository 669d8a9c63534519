use parking_lot::RwLock;

/// Process wide state shared by every output instance.
///
/// Workers only hold a reference to it; the instances never own it.
#[derive(Debug)]
pub struct GlobalState {
    outputs: RwLock<Vec<Option<String>>>,
}

impl GlobalState {
    pub fn new(capacity: usize) -> Self {
        Self {
            outputs: RwLock::new(vec![None; capacity]),
        }
    }

    /// Records the name of the output plugin occupying slot `id`.
    pub fn set_output_name(&self, id: usize, name: impl Into<String>) {
        let mut outputs = self.outputs.write();
        if let Some(slot) = outputs.get_mut(id) {
            *slot = Some(name.into());
        }
    }

    pub fn output_name(&self, id: usize) -> Option<String> {
        self.outputs.read().get(id).cloned().flatten()
    }
}
