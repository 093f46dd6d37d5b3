//! Add ports to EXPOSE, or take them away.

use std::sync::Arc;

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
use dockfix_syntax::Expose;
use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::Meta;
use dockfix_syntax::Space;
use dockfix_syntax::Stage;
use serde::Deserialize;

use crate::stage;

pub static ADD_DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-exposed-port",
    display_name: "Add exposed port",
    description: "Expose a port in a stage unless it is already exposed.",
    options: &[
        OptionSpec::new("port", OptionKind::String, "Port, range, or port/protocol.")
            .example("8080/tcp")
            .required(),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to the final stage.",
        ),
    ],
};

pub static REMOVE_DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "remove-exposed-port",
    display_name: "Remove exposed port",
    description: "Stop exposing a port. EXPOSE instructions left without ports are removed.",
    options: &[
        OptionSpec::new("port", OptionKind::String, "Port, range, or port/protocol.")
            .example("22")
            .required(),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to every stage.",
        ),
    ],
};

/// `8080` and `8080/TCP` both mean `8080/tcp`.
fn normalize(port: &str) -> String {
    match port.split_once('/') {
        Some((number, protocol)) => format!("{number}/{}", protocol.to_ascii_lowercase()),
        None => format!("{port}/tcp"),
    }
}

fn validate_port(recipe: &str, port: Option<&str>) -> Result<(), OptionsError> {
    dockfix_rewrite::options::require(recipe, "port", port)?;
    let port = port.unwrap_or_default();
    let (range, protocol) = port.split_once('/').unwrap_or((port, "tcp"));
    let numbers_ok = range.split('-').count() <= 2
        && range
            .split('-')
            .all(|number| number.parse::<u16>().is_ok_and(|number| number > 0));
    let protocol_ok = matches!(protocol.to_ascii_lowercase().as_str(), "tcp" | "udp" | "sctp");
    if numbers_ok && protocol_ok {
        Ok(())
    } else {
        Err(OptionsError::new(
            recipe,
            &["port"],
            format!("'{port}' is not a port such as 8080 or 53/udp"),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddExposedPort {
    pub port: Option<String>,
    pub stage: Option<String>,
}

impl Recipe for AddExposedPort {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &ADD_DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        validate_port(ADD_DESCRIPTOR.name, self.port.as_deref())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(AddPort {
            port: self.port.clone()?,
            stage: self.stage.clone(),
        })))
    }
}

struct AddPort {
    port: String,
    stage: Option<String>,
}

impl IsoVisitor for AddPort {
    fn visit_stage(&mut self, target: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        if !cx.is_target_stage(self.stage.as_deref()) {
            return Arc::clone(target);
        }

        let wanted = normalize(&self.port);
        let mut exposed = target.instructions.iter().filter_map(|instruction| match instruction {
            Instruction::Expose(expose) => Some(expose),
            _ => None,
        });
        let mut unknown = false;
        let already = exposed.any(|expose| {
            expose.ports.iter().any(|port| match port.literal() {
                Some(literal) => normalize(&literal) == wanted,
                None => {
                    unknown = true;
                    false
                }
            })
        });
        // A port named through a variable might be this one.
        if already || unknown {
            return Arc::clone(target);
        }

        let keyword = stage::keyword_like(target, InstructionKind::Expose);
        let index = stage::insertion_index(target, InstructionKind::Expose);
        stage::insert_at(target, index, |prefix| {
            Instruction::Expose(Arc::new(Expose {
                prefix,
                meta: Meta::new(),
                keyword,
                ports: vec![Arc::new(Argument::plain(Space::single(), self.port.as_str()))],
            }))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveExposedPort {
    pub port: Option<String>,
    pub stage: Option<String>,
}

impl Recipe for RemoveExposedPort {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &REMOVE_DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        validate_port(REMOVE_DESCRIPTOR.name, self.port.as_deref())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(RemovePort {
            port: normalize(self.port.as_deref()?),
            stage: self.stage.clone(),
        })))
    }
}

struct RemovePort {
    /// Normalised.
    port: String,
    stage: Option<String>,
}

impl RemovePort {
    fn keeps(&self, port: &Argument) -> bool {
        port.literal()
            .is_none_or(|literal| normalize(&literal) != self.port)
    }
}

impl IsoVisitor for RemovePort {
    fn visit_stage(&mut self, target: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        if self.stage.is_some() && !cx.is_target_stage(self.stage.as_deref()) {
            return Arc::clone(target);
        }

        let mut changed = false;
        let mut instructions = Vec::with_capacity(target.instructions.len());
        for instruction in &target.instructions {
            let Instruction::Expose(expose) = instruction else {
                instructions.push(instruction.clone());
                continue;
            };
            if expose.ports.iter().all(|port| self.keeps(port)) {
                instructions.push(instruction.clone());
                continue;
            }

            changed = true;
            let mut ports: Vec<Arc<Argument>> = expose
                .ports
                .iter()
                .filter(|port| self.keeps(port))
                .cloned()
                .collect();
            if ports.is_empty() {
                tracing::trace!(port = %self.port, "dropping empty EXPOSE");
                continue;
            }
            // The first remaining port takes the place right after the keyword.
            if let Some(first) = ports.first_mut() {
                if first.prefix != expose.ports[0].prefix {
                    *first = Arc::new(first.with_prefix(expose.ports[0].prefix.clone()));
                }
            }
            instructions.push(Instruction::Expose(Arc::new(Expose {
                ports,
                ..(**expose).clone()
            })));
        }

        if !changed {
            return Arc::clone(target);
        }
        Arc::new(Stage {
            instructions,
            ..(**target).clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    fn add(port: &str) -> AddExposedPort {
        AddExposedPort {
            port: Some(port.to_string()),
            stage: None,
        }
    }

    fn remove(port: &str) -> RemoveExposedPort {
        RemoveExposedPort {
            port: Some(port.to_string()),
            stage: None,
        }
    }

    #[test]
    fn add_after_existing_expose() {
        rewrite_test(
            &add("9090"),
            "FROM alpine\nEXPOSE 80\nCMD [\"app\"]\n",
            "FROM alpine\nEXPOSE 80\nEXPOSE 9090\nCMD [\"app\"]\n",
        );
    }

    #[test]
    fn default_protocol_is_tcp() {
        rewrite_noop(&add("8080/tcp"), "FROM alpine\nEXPOSE 8080\n");
        rewrite_noop(&add("8080"), "FROM alpine\nEXPOSE 8080/TCP\n");
        rewrite_test(
            &add("53/udp"),
            "FROM alpine\nEXPOSE 53\n",
            "FROM alpine\nEXPOSE 53\nEXPOSE 53/udp\n",
        );
    }

    #[test]
    fn variable_ports_stop_the_add() {
        rewrite_noop(&add("8080"), "FROM alpine\nEXPOSE ${PORT}\n");
    }

    #[test]
    fn remove_one_of_many() {
        rewrite_test(
            &remove("22"),
            "FROM alpine\nEXPOSE 22 80 443\n",
            "FROM alpine\nEXPOSE 80 443\n",
        );
    }

    #[test]
    fn remove_drops_empty_instructions_in_every_stage() {
        rewrite_test(
            &remove("22/tcp"),
            "FROM alpine AS a\nEXPOSE 22\nRUN true\nFROM alpine\nEXPOSE 22\nEXPOSE 80\n",
            "FROM alpine AS a\nRUN true\nFROM alpine\nEXPOSE 80\n",
        );
    }

    #[test]
    fn remove_in_one_stage() {
        let recipe = RemoveExposedPort {
            stage: Some("a".to_string()),
            ..remove("22")
        };
        rewrite_test(
            &recipe,
            "FROM alpine AS a\nEXPOSE 22\nFROM alpine\nEXPOSE 22\n",
            "FROM alpine AS a\nFROM alpine\nEXPOSE 22\n",
        );
    }

    #[test]
    fn ports_are_validated() {
        assert!(add("8080").validate().is_ok());
        assert!(add("8000-8010/udp").validate().is_ok());
        assert!(add("http").validate().is_err());
        assert!(add("80/icmp").validate().is_err());
        assert!(add("70000").validate().is_err());
        assert!(remove("").validate().is_err());
    }
}
