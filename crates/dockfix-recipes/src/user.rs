use std::sync::Arc;

use dockfix_rewrite::options;
use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::OptionsError;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Argument;
use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::Meta;
use dockfix_syntax::Space;
use dockfix_syntax::Stage;
use dockfix_syntax::User;
use serde::Deserialize;

use crate::stage;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-user-instruction",
    display_name: "Add USER instruction",
    description: "Run the image as a non-root user by adding USER before CMD or ENTRYPOINT \
                  when the stage does not set one.",
    options: &[
        OptionSpec::new("user", OptionKind::String, "User name or uid, optionally with a group.")
            .example("appuser")
            .required(),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to the final stage.",
        ),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUserInstruction {
    pub user: Option<String>,
    pub stage: Option<String>,
}

impl Recipe for AddUserInstruction {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        options::require(DESCRIPTOR.name, "user", self.user.as_deref())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(AddUser {
            user: self.user.clone()?,
            stage: self.stage.clone(),
        })))
    }
}

struct AddUser {
    user: String,
    stage: Option<String>,
}

impl IsoVisitor for AddUser {
    fn visit_stage(&mut self, target: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        let has_user = target
            .instructions
            .iter()
            .any(|instruction| instruction.kind() == InstructionKind::User);
        if has_user || !cx.is_target_stage(self.stage.as_deref()) {
            return Arc::clone(target);
        }

        let keyword = stage::keyword_like(target, InstructionKind::User);
        let index = stage::before_terminal(target);
        stage::insert_at(target, index, |prefix| {
            Instruction::User(Arc::new(User {
                prefix,
                meta: Meta::new(),
                keyword,
                user: Arc::new(Argument::plain(Space::single(), self.user.as_str())),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    fn add_user(user: &str) -> AddUserInstruction {
        AddUserInstruction {
            user: Some(user.to_string()),
            stage: None,
        }
    }

    #[test]
    fn final_stage_only() {
        rewrite_test(
            &add_user("appuser"),
            "FROM golang AS builder\nRUN go build -o /app\nFROM alpine\nCOPY --from=builder /app /app\nENTRYPOINT [\"/app\"]\n",
            "FROM golang AS builder\nRUN go build -o /app\nFROM alpine\nCOPY --from=builder /app /app\nUSER appuser\nENTRYPOINT [\"/app\"]\n",
        );
    }

    #[test]
    fn existing_user_is_respected() {
        rewrite_noop(&add_user("appuser"), "FROM alpine\nUSER nobody\nCMD [\"sh\"]\n");
    }

    #[test]
    fn stage_by_index() {
        let recipe = AddUserInstruction {
            stage: Some("0".to_string()),
            ..add_user("1000:1000")
        };
        rewrite_test(
            &recipe,
            "FROM golang\nRUN make\nFROM alpine\n",
            "FROM golang\nRUN make\nUSER 1000:1000\nFROM alpine\n",
        );
    }

    #[test]
    fn user_is_required() {
        assert!(add_user(" ").validate().is_err());
    }
}
