/// A `ParamGen` generates the initial weights of newly materialized values.
pub trait ParamGen {
    /// Overwrites every element of `out` with a freshly generated weight.
    ///
    /// # Arguments
    /// * `out` - The weights of a value being constructed.
    fn fill(&mut self, out: &mut [f32]);
}

impl<G: ParamGen + ?Sized> ParamGen for Box<G> {
    fn fill(&mut self, out: &mut [f32]) {
        (**self).fill(out);
    }
}
