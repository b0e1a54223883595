//! Prompt templates and per-symbol context assembly.
//!
//! Two template profiles ship with the pipeline: `dev` (detailed
//! developer-facing docs) and `overview` (short testing-oriented
//! summaries). Templates use `{placeholder}` tokens substituted by
//! [`build_prompts`].

use doctree_prep::{DocItemKind, ItemId, MetaInfo};
use std::collections::BTreeMap;

/// Subject marker in the rendered project-structure tree.
const SUBJECT_MARK: &str = "✳️";

/// Separator between referee/referrer excerpts (10 characters).
const SECTION_SEPARATOR: &str = "==========";

/// One named pair of system/user templates.
#[derive(Debug, Clone, Copy)]
pub struct PromptProfile {
    pub name: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

const DEV_SYSTEM: &str = "\
You are an AI documentation assistant, and your task is to generate documentation based \
on the given code of an object. The purpose of the documentation is to help developers \
and beginners understand the function and specific usage of the code.

The path of the document you need to generate in this project is {file_path}{project_structure_prefix}
{project_structure}
Now you need to generate a document for a {code_type_tell}, whose name is \"{code_name}\".

The content of the code is as follows:
{code_content}

{reference_letter}
{referencer_content}

Please generate a detailed explanation document for this object based on the code of the \
target object itself {combine_ref_situation}.

Please write out the function of this {code_type_tell} in bold plain text, followed by a \
detailed analysis in plain text (including all details), in professional {language}, to \
serve as the documentation for this part of the code.

The standard format is in the Markdown reference paragraph below; you must output the \
content of the paragraph, and do not write the reference paragraph marks:

**{code_name}**: The function of {code_name} is XXX.
**{parameters_or_attribute}**: The {parameters_or_attribute} of this {code_type_tell}.
**Code Description**: The description of this {code_type_tell}.
{has_relationship}
**Note**: Points to note about the use of the code
{have_return_tell}

Please note:
- Any part of the content you generate SHOULD NOT CONTAIN Markdown hierarchical heading \
and divider syntax.
- Write mainly in the desired language. If necessary, you can write with some English \
words in the analysis and description to enhance the document's readability because you \
do not need to translate the function name or variable name into the target language.";

const DEV_USER: &str = "\
Please note that the audience of the documentation is mostly developers who want to \
understand and maybe reuse the code. Keep the analysis accurate and grounded in the \
given source; avoid speculation or inaccuracies. Now, provide the documentation for the \
target object in {language} in a professional way.";

const OVERVIEW_SYSTEM: &str = "\
As an AI documentation assistant, your task is to generate documentation for the \
{code_name} {code_type_tell} in the {file_path} document of the given project{combine_ref_situation}
The related hierarchical structure of this project is as follows (the current object is \
marked with a {subject_mark}):
{project_structure}
The content of the code is as follows:
{code_content}

{reference_letter}
{referencer_content}

The documentation should include the function, {parameters_or_attribute}, code \
description, and any notes in {language}. This documentation should focus on aspects \
relevant to testing, such as edge cases, error handling, and return values.
{has_relationship}
{have_return_tell}

Avoid using Markdown hierarchical heading and divider syntax. You may use English words \
for function names or variable names.";

const OVERVIEW_USER: &str = "\
Remember, your audience is testers. Generate precise content that highlights the aspects \
of the {code_name} {code_type_tell} that are relevant to testing. Avoid speculation or \
inaccuracies. Now, provide the documentation for {code_name} in {language} \
professionally, keeping the needs of testers in mind.";

pub const PROFILES: &[PromptProfile] = &[
    PromptProfile {
        name: "dev",
        system: DEV_SYSTEM,
        user: DEV_USER,
    },
    PromptProfile {
        name: "overview",
        system: OVERVIEW_SYSTEM,
        user: OVERVIEW_USER,
    },
];

/// Look a profile up by its `--profile` name.
pub fn select_profile(name: &str) -> Option<&'static PromptProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

/// Fully-substituted prompts for one symbol, plus the identifiers the
/// driver needs for logging and the failure placeholder.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub qualified_name: String,
    pub kind: DocItemKind,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Assemble the system and user prompts for `id` from the tree state.
pub fn build_prompts(meta: &MetaInfo, id: ItemId, profile: &PromptProfile) -> PromptContext {
    let tree = &meta.tree;
    let item = tree.get(id);
    let qualified_name = tree.full_name(id);

    let (code_name, code_content, code_type, have_return) = match &item.content {
        Some(record) => (
            record.name.clone(),
            record.code_content.clone(),
            record.kind,
            record.have_return,
        ),
        None => (item.name.clone(), String::new(), doctree_prep::SymbolKindTag::FunctionDef, false),
    };

    let referencer_paths: Vec<String> = item
        .references_to_this
        .iter()
        .map(|&r| tree.full_name(r))
        .collect();
    let referee_paths: Vec<String> = item
        .references_from_this
        .iter()
        .map(|&r| tree.full_name(r))
        .collect();

    let project_structure = build_path_tree(&referencer_paths, &referee_paths, &qualified_name);

    let reference_letter = excerpt_section(
        meta,
        &item.references_from_this,
        "As you can see, the code calls the following objects, their code and docs are as following:",
    );
    let referencer_content = excerpt_section(
        meta,
        &item.references_to_this,
        "Also, the code has been called by the following objects, their code and docs are as following:",
    );

    let is_class = code_type == doctree_prep::SymbolKindTag::ClassDef;
    let code_type_tell = if is_class { "Class" } else { "Function" };
    let parameters_or_attribute = if is_class { "attributes" } else { "parameters" };
    let have_return_tell = if have_return {
        "**Output Example**: Mock up a possible appearance of the code's return value."
    } else {
        ""
    };
    let combine_ref_situation = if referencer_paths.is_empty() {
        ""
    } else {
        "and combine it with its calling situation in the project,"
    };
    let has_relationship = match (!referencer_content.is_empty(), !reference_letter.is_empty()) {
        (true, true) => {
            "And please include the reference relationship with its callers and callees in the project from a functional perspective"
        }
        (true, false) => {
            "And please include the relationship with its callers in the project from a functional perspective."
        }
        (false, true) => {
            "And please include the relationship with its callees in the project from a functional perspective."
        }
        (false, false) => "",
    };
    let project_structure_prefix = ", and the related hierarchical structure of this project \
is as follows (The current object is marked with an ✳️):";

    let substitutions: &[(&str, &str)] = &[
        ("{combine_ref_situation}", combine_ref_situation),
        ("{file_path}", &qualified_name),
        ("{project_structure_prefix}", project_structure_prefix),
        ("{project_structure}", &project_structure),
        ("{code_type_tell}", code_type_tell),
        ("{code_name}", &code_name),
        ("{code_content}", &code_content),
        ("{have_return_tell}", have_return_tell),
        ("{has_relationship}", has_relationship),
        ("{reference_letter}", &reference_letter),
        ("{referencer_content}", &referencer_content),
        ("{parameters_or_attribute}", parameters_or_attribute),
        ("{subject_mark}", SUBJECT_MARK),
        ("{language}", "English"),
    ];

    PromptContext {
        qualified_name: qualified_name.clone(),
        kind: item.kind,
        system_prompt: render(profile.system, substitutions),
        user_prompt: render(profile.user, substitutions),
    }
}

fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (token, value) in substitutions {
        out = out.replace(token, value);
    }
    out
}

/// Qualified name + latest doc + raw code for each edge target, separated
/// by `==========` lines. Empty when there are no targets.
fn excerpt_section(meta: &MetaInfo, targets: &[ItemId], header: &str) -> String {
    if targets.is_empty() {
        return String::new();
    }
    let mut parts = vec![header.to_string()];
    for &target in targets {
        let item = meta.tree.get(target);
        let doc = item.latest_doc().unwrap_or("None");
        let code = item
            .content
            .as_ref()
            .map(|r| r.code_content.as_str())
            .unwrap_or("");
        parts.push(format!(
            "obj: {}\nDocument: \n{}\nRaw code:```\n{}\n```{}",
            meta.tree.full_name(target),
            doc,
            code,
            SECTION_SEPARATOR,
        ));
    }
    parts.join("\n")
}

/// Nested rendering of the union of referrer paths, referee paths, and the
/// subject's own path, the subject leaf marked.
fn build_path_tree(referencers: &[String], referees: &[String], subject_path: &str) -> String {
    #[derive(Default)]
    struct PathNode(BTreeMap<String, PathNode>);

    fn insert(node: &mut PathNode, segments: &[&str]) {
        if let Some((first, rest)) = segments.split_first() {
            let child = node.0.entry(first.to_string()).or_default();
            insert(child, rest);
        }
    }

    fn render(node: &PathNode, indent: usize, out: &mut String) {
        for (name, child) in &node.0 {
            out.push_str(&"    ".repeat(indent));
            out.push_str(name);
            out.push('\n');
            render(child, indent + 1, out);
        }
    }

    let mut root = PathNode::default();
    for path in referencers.iter().chain(referees) {
        insert(&mut root, &path.split('/').collect::<Vec<_>>());
    }
    let mut subject_segments: Vec<String> =
        subject_path.split('/').map(|s| s.to_string()).collect();
    if let Some(last) = subject_segments.last_mut() {
        *last = format!("{SUBJECT_MARK}{last}");
    }
    insert(
        &mut root,
        &subject_segments.iter().map(String::as_str).collect::<Vec<_>>(),
    );

    let mut out = String::new();
    render(&root, 0, &mut out);
    out
}
