//! Placing new instructions in a stage.

use std::sync::Arc;

use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::Space;
use dockfix_syntax::Stage;

/// Index before the first CMD or ENTRYPOINT, or the end of the stage.
pub(crate) fn before_terminal(stage: &Stage) -> usize {
    stage
        .instructions
        .iter()
        .position(|instruction| instruction.kind().is_terminal())
        .unwrap_or(stage.instructions.len())
}

/// Where a new instruction of `kind` belongs: right after the last one of
/// the same kind, otherwise before the first CMD or ENTRYPOINT, otherwise
/// at the end.
pub(crate) fn insertion_index(stage: &Stage, kind: InstructionKind) -> usize {
    stage
        .instructions
        .iter()
        .rposition(|instruction| instruction.kind() == kind)
        .map_or_else(|| before_terminal(stage), |last| last + 1)
}

/// Line break and indentation for an instruction placed at `index`,
/// copied from the instruction it follows.
fn prefix_at(stage: &Stage, index: usize) -> Space {
    match index.checked_sub(1) {
        Some(previous) => stage.instructions[previous].prefix().line_break_like(),
        None => stage.from.prefix.line_break_like(),
    }
}

/// A copy of the stage with a new instruction at `index`. `build` gets the
/// prefix the instruction should carry.
pub(crate) fn insert_at(
    stage: &Stage,
    index: usize,
    build: impl FnOnce(Space) -> Instruction,
) -> Arc<Stage> {
    let instruction = build(prefix_at(stage, index));
    let mut instructions = stage.instructions.clone();
    instructions.insert(index, instruction);
    Arc::new(Stage {
        instructions,
        ..stage.clone()
    })
}

/// The keyword spelled in the case the stage's FROM uses.
pub(crate) fn keyword_like(stage: &Stage, kind: InstructionKind) -> String {
    let keyword = kind.keyword();
    if stage.from.keyword.chars().all(|c| c.is_ascii_lowercase()) {
        keyword.to_ascii_lowercase()
    } else {
        keyword.to_string()
    }
}

/// Keep `replacement` in the case of `original`: `add` becomes `copy`,
/// `Add` becomes `Copy`.
pub(crate) fn keyword_in_case_of(original: &str, replacement: &str) -> String {
    if original.chars().all(|c| c.is_ascii_lowercase()) {
        replacement.to_ascii_lowercase()
    } else if original.chars().all(|c| c.is_ascii_uppercase()) {
        replacement.to_ascii_uppercase()
    } else {
        let lower = replacement.to_ascii_lowercase();
        let mut chars = lower.chars();
        chars
            .next()
            .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use dockfix_syntax::parse;
    use dockfix_syntax::print;
    use dockfix_syntax::Document;
    use dockfix_syntax::Argument;
    use dockfix_syntax::Meta;
    use dockfix_syntax::User;

    use super::*;

    fn parse_stage(text: &str) -> (Document, Arc<Stage>) {
        let document = parse(text).unwrap();
        let stage = Arc::clone(&document.stages[0]);
        (document, stage)
    }

    fn user(prefix: Space) -> Instruction {
        Instruction::User(Arc::new(User {
            prefix,
            meta: Meta::new(),
            keyword: "USER".to_string(),
            user: Arc::new(Argument::plain(Space::single(), "app")),
        }))
    }

    fn with_stage(document: &Document, stage: Arc<Stage>) -> String {
        print(&Document {
            stages: vec![stage],
            ..document.clone()
        })
    }

    #[test]
    fn insertion_prefers_same_kind_then_terminal() {
        let (_, stage) = parse_stage("FROM a\nLABEL a=1\nRUN x\nCMD y\n");
        assert_eq!(insertion_index(&stage, InstructionKind::Label), 1);
        assert_eq!(insertion_index(&stage, InstructionKind::User), 2);
        let (_, bare) = parse_stage("FROM a\nRUN x\n");
        assert_eq!(insertion_index(&bare, InstructionKind::User), 1);
    }

    #[test]
    fn comments_stay_with_the_instruction_they_precede() {
        let (document, stage) = parse_stage("FROM a\n  RUN x\n\n# start\n  CMD y\n");
        let index = before_terminal(&stage);
        let edited = insert_at(&stage, index, user);
        assert_eq!(
            with_stage(&document, edited),
            "FROM a\n  RUN x\n  USER app\n\n# start\n  CMD y\n"
        );
    }

    #[test]
    fn insert_into_empty_stage() {
        let (document, stage) = parse_stage("FROM a");
        let edited = insert_at(&stage, 0, user);
        assert_eq!(with_stage(&document, edited), "FROM a\nUSER app");
    }

    #[test]
    fn keyword_case() {
        assert_eq!(keyword_in_case_of("add", "COPY"), "copy");
        assert_eq!(keyword_in_case_of("ADD", "copy"), "COPY");
        assert_eq!(keyword_in_case_of("Add", "COPY"), "Copy");
        let (_, lower) = parse_stage("from a\n");
        assert_eq!(keyword_like(&lower, InstructionKind::Label), "label");
    }
}
