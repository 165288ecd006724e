/// Node trait shared by every stage of the signal chain

/// A processing stage between the source and the output
///
/// # Safety
/// - Must NOT allocate memory in `process()` (real-time constraint)
/// - Must be Send so the graph can be rendered on an audio thread
pub trait AudioEffect: Send {
    /// Process audio buffer in-place
    ///
    /// # Arguments
    /// * `buffer` - Interleaved stereo samples (L, R, L, R, ...)
    /// * `sample_rate` - Sample rate in Hz
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32);

    /// Clear internal history (new source, seek)
    fn reset(&mut self);

    /// Enable/disable the node's effect
    ///
    /// Disabling must not interrupt the signal: a disabled node still passes
    /// audio through, it just stops colouring it.
    fn set_enabled(&mut self, enabled: bool);

    /// Check if the node's effect is enabled
    fn is_enabled(&self) -> bool;

    /// Get node name (for debugging)
    fn name(&self) -> &str;
}
