//! Add a key to a stage's LABEL or ENV instructions, or update it in place.

use std::sync::Arc;

use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::OptionsError;
use dockfix_rewrite::VisitContext;
use dockfix_syntax::Env;
use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::KeyValue;
use dockfix_syntax::Label;
use dockfix_syntax::Meta;
use dockfix_syntax::Space;
use dockfix_syntax::Stage;

use crate::stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Upsert {
    pub kind: InstructionKind,
    pub key: String,
    pub value: String,
    pub overwrite_existing: bool,
    pub stage: Option<String>,
}

/// Key and value checks shared by the label and env recipes.
pub(crate) fn validate(
    recipe: &str,
    key: Option<&str>,
    value: Option<&str>,
) -> Result<(), OptionsError> {
    dockfix_rewrite::options::require(recipe, "key", key)?;
    if key.is_some_and(|key| key.contains(char::is_whitespace)) {
        return Err(OptionsError::new(recipe, &["key"], "key must not contain whitespace"));
    }
    if value.is_none() {
        return Err(OptionsError::new(recipe, &["value"], "value is required"));
    }
    Ok(())
}

impl Upsert {
    fn find<'a>(&self, stage: &'a Stage) -> Option<(usize, usize, &'a Arc<KeyValue>)> {
        stage
            .instructions
            .iter()
            .enumerate()
            .filter(|(_, instruction)| instruction.kind() == self.kind)
            .find_map(|(idx, instruction)| {
                let pairs = instruction.pairs()?;
                pairs
                    .iter()
                    .enumerate()
                    .find(|(_, pair)| pair.key_text() == self.key)
                    .map(|(pair_idx, pair)| (idx, pair_idx, pair))
            })
    }

    fn update(
        &self,
        stage: &Arc<Stage>,
        idx: usize,
        pair_idx: usize,
        pair: &KeyValue,
    ) -> Arc<Stage> {
        if pair.value_text().as_deref() == Some(self.value.as_str()) {
            return Arc::clone(stage);
        }
        if !self.overwrite_existing {
            tracing::debug!(key = %self.key, "key exists, not overwriting");
            return Arc::clone(stage);
        }

        let updated = Arc::new(pair.with_value(&self.value));
        let instruction = match &stage.instructions[idx] {
            Instruction::Label(label) => {
                let mut pairs = label.pairs.clone();
                pairs[pair_idx] = updated;
                Instruction::Label(Arc::new(Label {
                    pairs,
                    ..(**label).clone()
                }))
            }
            Instruction::Env(env) => {
                let mut pairs = env.pairs.clone();
                pairs[pair_idx] = updated;
                Instruction::Env(Arc::new(Env {
                    pairs,
                    ..(**env).clone()
                }))
            }
            _ => return Arc::clone(stage),
        };
        let mut instructions = stage.instructions.clone();
        instructions[idx] = instruction;
        Arc::new(Stage {
            instructions,
            ..(**stage).clone()
        })
    }

    fn insert(&self, target: &Stage) -> Arc<Stage> {
        let keyword = stage::keyword_like(target, self.kind);
        let pairs = vec![Arc::new(KeyValue::assignment(Space::single(), &self.key, &self.value))];
        let index = stage::insertion_index(target, self.kind);
        stage::insert_at(target, index, |prefix| match self.kind {
            InstructionKind::Env => Instruction::Env(Arc::new(Env {
                prefix,
                meta: Meta::new(),
                keyword,
                pairs,
            })),
            _ => Instruction::Label(Arc::new(Label {
                prefix,
                meta: Meta::new(),
                keyword,
                pairs,
            })),
        })
    }
}

impl IsoVisitor for Upsert {
    fn visit_stage(&mut self, stage: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        if !cx.is_target_stage(self.stage.as_deref()) {
            return Arc::clone(stage);
        }
        match self.find(stage) {
            Some((idx, pair_idx, pair)) => self.update(stage, idx, pair_idx, pair),
            None => self.insert(stage),
        }
    }
}
