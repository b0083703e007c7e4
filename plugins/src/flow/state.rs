use serde::Serialize;

/// How far the design has progressed through the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileState {
    #[default]
    None,
    IpGenerated,
    Synthesized,
    Packed,
    GloballyPlaced,
    Placed,
    Routed,
    BitstreamGenerated,
}

impl CompileState {
    /// Global and detailed placement accept packed or (globally) placed designs.
    pub fn can_place(self) -> bool {
        matches!(
            self,
            CompileState::Packed | CompileState::GloballyPlaced | CompileState::Placed
        )
    }

    pub fn can_route(self) -> bool {
        self == CompileState::Placed
    }

    pub fn can_generate_bitstream(self) -> bool {
        self == CompileState::Routed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisites_follow_the_flow() {
        assert!(!CompileState::Synthesized.can_place());
        assert!(CompileState::Packed.can_place());
        assert!(CompileState::Placed.can_place());
        assert!(!CompileState::Routed.can_place());
        assert!(!CompileState::GloballyPlaced.can_route());
        assert!(CompileState::Placed.can_route());
        assert!(CompileState::Routed.can_generate_bitstream());
        assert!(CompileState::Packed < CompileState::Routed);
    }
}
