use dockfix_syntax::parse;
use dockfix_syntax::ArgumentContent;
use dockfix_syntax::CommandForm;
use dockfix_syntax::HealthcheckCheck;
use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::Operands;
use dockfix_syntax::ParseErrorKind;
use dockfix_syntax::Separator;

fn error_code(source: &str) -> (&'static str, u32, u32) {
    let err = parse(source).expect_err("expected a parse error");
    (err.diagnostic_code(), err.line, err.column)
}

#[test]
fn test_stages_and_aliases() {
    let document = parse(include_str!("fixtures/multi-stage.Dockerfile")).unwrap();

    assert_eq!(document.preamble.len(), 2);
    assert_eq!(document.stages.len(), 2);
    assert_eq!(document.stages[0].name().as_deref(), Some("build"));
    assert_eq!(document.stages[1].name().as_deref(), Some("runtime"));

    let (idx, _) = document.stage_named("BUILD").unwrap();
    assert_eq!(idx, 0);

    let build = &document.stages[0].from;
    assert_eq!(build.image.text(), "golang");
    assert_eq!(build.tag.as_ref().map(|tag| tag.text()).as_deref(), Some("${GO_VERSION}-alpine"));
    assert_eq!(
        build
            .flag("platform")
            .map(|flag| flag.value.as_ref().map(|v| v.text())),
        Some(Some("$BUILDPLATFORM".to_string()))
    );
}

#[test]
fn test_image_reference_with_registry_port_and_digest() {
    let document = parse(include_str!("fixtures/all-instructions.Dockerfile")).unwrap();
    let from = &document.stages[0].from;

    assert_eq!(from.image.text(), "registry.example.com:5000/team/base");
    assert!(from.tag.is_none());
    assert_eq!(
        from.digest.as_ref().map(|digest| digest.text()).as_deref(),
        Some("sha256:4b825dc642cb6eb9a060e54bf8d69288fbee4904")
    );
    assert_eq!(
        from.reference(),
        "registry.example.com:5000/team/base@sha256:4b825dc642cb6eb9a060e54bf8d69288fbee4904"
    );
}

#[test]
fn test_instruction_kinds_in_order() {
    let document = parse(include_str!("fixtures/all-instructions.Dockerfile")).unwrap();
    let kinds: Vec<InstructionKind> = document.stages[0]
        .instructions
        .iter()
        .map(Instruction::kind)
        .collect();

    assert_eq!(
        kinds,
        vec![
            InstructionKind::Maintainer,
            InstructionKind::Env,
            InstructionKind::Env,
            InstructionKind::Arg,
            InstructionKind::Arg,
            InstructionKind::Label,
            InstructionKind::Add,
            InstructionKind::Add,
            InstructionKind::Volume,
            InstructionKind::Volume,
            InstructionKind::Shell,
            InstructionKind::Onbuild,
            InstructionKind::Onbuild,
            InstructionKind::Healthcheck,
            InstructionKind::Stopsignal,
            InstructionKind::User,
            InstructionKind::Workdir,
            InstructionKind::Expose,
            InstructionKind::Cmd,
            InstructionKind::Entrypoint,
        ]
    );
}

#[test]
fn test_key_value_forms() {
    let document = parse(include_str!("fixtures/all-instructions.Dockerfile")).unwrap();
    let instructions = &document.stages[0].instructions;

    let legacy = instructions[1].pairs().unwrap();
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].separator, Separator::Whitespace);
    assert_eq!(legacy[0].key_text(), "APP_HOME");
    assert_eq!(legacy[0].value_text().as_deref(), Some("/srv/app with spaces"));

    let pairs = instructions[2].pairs().unwrap();
    let values: Vec<(String, Option<String>)> = pairs
        .iter()
        .map(|pair| (pair.key_text(), pair.value_text()))
        .collect();
    assert_eq!(
        values,
        vec![
            ("A".to_string(), Some("1".to_string())),
            ("B".to_string(), Some("two words".to_string())),
            ("C".to_string(), Some(String::new())),
        ]
    );

    let bare = instructions[3].pairs().unwrap();
    assert_eq!(bare[0].separator, Separator::None);
    assert_eq!(bare[0].value_text(), None);

    let labels = instructions[5].pairs().unwrap();
    assert_eq!(labels[1].key_text(), "quoted key");
    assert!(labels[0].value.as_ref().unwrap().has_variable());
}

#[test]
fn test_exec_form_and_fallback() {
    let document = parse(include_str!("fixtures/all-instructions.Dockerfile")).unwrap();
    let instructions = &document.stages[0].instructions;

    let Instruction::Shell(shell) = &instructions[10] else {
        panic!("expected SHELL");
    };
    let exec = shell.command.as_exec().unwrap();
    assert_eq!(exec.values(), vec!["/bin/bash", "-o", "pipefail", "-c"]);

    let Instruction::Entrypoint(entrypoint) = &instructions[19] else {
        panic!("expected ENTRYPOINT");
    };
    let fallback = entrypoint.command.as_shell().unwrap();
    assert_eq!(fallback.text(), r#"["broken", json]"#);

    let Instruction::Add(add) = &instructions[7] else {
        panic!("expected ADD");
    };
    assert!(matches!(add.operands, Operands::Exec(_)));
}

#[test]
fn test_healthcheck_and_onbuild() {
    let document = parse(include_str!("fixtures/all-instructions.Dockerfile")).unwrap();

    let Instruction::Healthcheck(healthcheck) = &document.stages[0].instructions[13] else {
        panic!("expected HEALTHCHECK");
    };
    assert_eq!(healthcheck.flags.len(), 2);
    let HealthcheckCheck::Cmd(cmd) = &healthcheck.check else {
        panic!("expected HEALTHCHECK CMD");
    };
    assert_eq!(
        cmd.command.as_shell().map(|shell| shell.text()).as_deref(),
        Some("curl -f http://localhost/ || exit 1")
    );

    let Instruction::Onbuild(onbuild) = &document.stages[0].instructions[11] else {
        panic!("expected ONBUILD");
    };
    assert_eq!(onbuild.trigger.kind(), InstructionKind::Copy);

    let Instruction::Healthcheck(none) = &document.stages[1].instructions[0] else {
        panic!("expected HEALTHCHECK NONE");
    };
    assert!(matches!(none.check, HealthcheckCheck::None(_)));
}

#[test]
fn test_heredoc_bodies_are_not_instructions() {
    let document = parse(include_str!("fixtures/heredoc.Dockerfile")).unwrap();

    assert_eq!(document.stages.len(), 1);
    let instructions = &document.stages[0].instructions;
    assert_eq!(instructions.len(), 4);

    let Instruction::Run(run) = &instructions[0] else {
        panic!("expected RUN");
    };
    let CommandForm::Heredoc(heredoc) = &run.command else {
        panic!("expected heredoc form");
    };
    assert_eq!(heredoc.delimiter, "EOF");
    assert!(heredoc.content().contains("FROM this line is body text"));

    let Instruction::Copy(copy) = &instructions[1] else {
        panic!("expected COPY");
    };
    let Operands::Heredoc(heredoc) = &copy.operands else {
        panic!("expected heredoc operands");
    };
    assert!(heredoc.strip_tabs);
    assert_eq!(heredoc.delimiter, "CONF");
    assert_eq!(
        heredoc.destination.as_ref().map(|d| d.text()).as_deref(),
        Some("/etc/app/app.conf")
    );

    let Instruction::Run(two) = &instructions[2] else {
        panic!("expected RUN");
    };
    let text = two.command.as_shell().unwrap().text();
    assert!(text.starts_with("cat <<A > /a.txt && cat <<B > /b.txt\nfirst\nA"));
    assert!(text.ends_with("second\nB"));
}

#[test]
fn test_variables_are_fragments() {
    let document = parse("FROM alpine\nWORKDIR ${HOME}/app\n").unwrap();
    let Instruction::Workdir(workdir) = &document.stages[0].instructions[0] else {
        panic!("expected WORKDIR");
    };
    assert_eq!(
        workdir.path.contents,
        vec![
            ArgumentContent::Variable {
                name: "HOME".to_string(),
                braced: true
            },
            ArgumentContent::plain("/app"),
        ]
    );
}

#[test]
fn test_keywords_keep_original_case() {
    let document = parse("from alpine as base\nrun true\n").unwrap();
    assert_eq!(document.stages[0].from.keyword, "from");
    let alias = document.stages[0].from.alias.as_ref().unwrap();
    assert_eq!(alias.keyword, "as");
    assert_eq!(document.stages[0].instructions[0].keyword(), "run");
}

#[test]
fn test_range_markers() {
    let source = "FROM alpine\nRUN echo hi\n";
    let document = parse(source).unwrap();
    let run = &document.stages[0].instructions[0];
    let range = run.meta().markers().range().unwrap();
    assert_eq!(&source[range.start_usize()..range.end_usize()], "RUN echo hi");
}

mod errors {
    use super::*;

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(error_code("FROM alpine\nLABEL a=\"open\n"), ("P100", 2, 9));
    }

    #[test]
    fn test_unknown_instruction() {
        let err = parse("FROM alpine\nRUNN make\n").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownInstruction {
                keyword: "RUNN".to_string()
            }
        );
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_missing_argument() {
        assert_eq!(error_code("FROM alpine\nCOPY onlyone\n").0, "P102");
        assert_eq!(error_code("FROM alpine\nRUN\n").0, "P102");
        assert_eq!(error_code("FROM\n").0, "P102");
    }

    #[test]
    fn test_unterminated_heredoc() {
        assert_eq!(error_code("FROM alpine\nRUN <<EOF\necho hi\n").0, "P103");
    }

    #[test]
    fn test_invalid_flag() {
        assert_eq!(error_code("FROM alpine\nCOPY --=x a b\n").0, "P104");
    }

    #[test]
    fn test_instruction_before_from() {
        assert_eq!(error_code("RUN make\nFROM alpine\n"), ("P105", 1, 1));
    }

    #[test]
    fn test_no_from() {
        assert_eq!(error_code("# only a comment\nARG X=1\n").0, "P106");
        assert_eq!(error_code("").0, "P106");
    }

    #[test]
    fn test_label_without_equals() {
        assert_eq!(error_code("FROM alpine\nLABEL version 1.0\n").0, "P107");
    }

    #[test]
    fn test_extra_words_after_from() {
        assert_eq!(error_code("FROM alpine AS base extra\n").0, "P108");
        assert_eq!(error_code("FROM alpine base\n").0, "P108");
    }

    #[test]
    fn test_error_display() {
        let err = parse("FROM alpine\nLABEL version 1.0\n").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"2:7: LABEL expects key=value pairs, found 'version'");
    }
}
