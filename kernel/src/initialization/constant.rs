use super::ParamGen;

/// A parameter generator that always generates the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstParamGen {
    value: f32,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Default for ConstParamGen {
    fn default() -> Self {
        Self::new(0.)
    }
}

impl ParamGen for ConstParamGen {
    fn fill(&mut self, out: &mut [f32]) {
        out.fill(self.value);
    }
}
