/// Knobs for the verifier
///
/// The defaults match what a runtime would accept.
#[derive(Clone, Debug)]
pub struct VerifierSettings {
    /// Reject the body if the operand stack ever grows taller than this
    pub max_stack: Option<usize>,

    /// The operand stack must be empty when control enters a try interval
    pub require_empty_stack_at_try_entry: bool,

    /// Allow `ret` from inside try intervals and handlers (normally it is only allowed outside)
    pub allow_return_in_protected_regions: bool,

    /// Check that a call with the `tail.` prefix is immediately followed by `ret`
    pub check_tail_calls: bool,
}

impl Default for VerifierSettings {
    fn default() -> VerifierSettings {
        VerifierSettings {
            max_stack: None,
            require_empty_stack_at_try_entry: true,
            allow_return_in_protected_regions: false,
            check_tail_calls: true,
        }
    }
}
