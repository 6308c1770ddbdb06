//! Nesting resolver for strata.
//!
//! A composed document may contain nested-stack placeholders: resources of
//! the nested-stack type carrying an embedded sub-document under
//! `Properties.Stack`. The nesting pass rewrites such a document so every
//! embedded template can be deployed as a separate artifact:
//!
//! - Each nested parameter is wired against an existing top-level
//!   parameter, a previously registered sibling output, or a newly minted
//!   top-level parameter (in that priority order)
//! - Each embedded template is detached and handed to a caller-supplied
//!   locator callback for persistence; the returned locator string replaces
//!   it on the placeholder resource
//!
//! Resources are processed in declaration order, which is the visibility
//! rule: a stack may consume the outputs only of stacks processed earlier
//! in the same pass. Forward references are not resolved.

mod remap;


use crate::document::{Document, Intrinsic, Mapping, Node, OUTPUTS, PARAMETERS, RESOURCES};
use crate::error::Result;
use crate::sources::{load_document_file, resolve_template, TemplatePaths};
use indexmap::IndexMap;
use serde_json::Value;

/// Resource type marking a nested-stack placeholder.
pub const NESTED_STACK_TYPE: &str = "AWS::CloudFormation::Stack";

/// Options for a nesting pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestingOptions {
    /// Synthesize a top-level output for every entry in the final output
    /// map.
    pub collect_outputs: bool,
}

impl NestingOptions {
    /// Options with output collection enabled.
    pub fn collect_outputs() -> Self {
        NestingOptions {
            collect_outputs: true,
        }
    }
}

/// Whether any resource of the document is a nested-stack placeholder.
pub fn has_nested_stacks(document: &Document) -> bool {
    resource_names(document)
        .iter()
        .any(|name| is_nested_stack(document, name))
}

/// Whether every resource of the document is a nested-stack placeholder.
/// Vacuously true for a document with no resources.
pub fn only_nested_stacks(document: &Document) -> bool {
    resource_names(document)
        .iter()
        .all(|name| is_nested_stack(document, name))
}

/// Run the nesting pass over a composed document.
///
/// The locator callback receives each detached template as a plain nested
/// structure, exactly once per nested resource, synchronously and in
/// declaration order, and returns the remote locator stored on the
/// placeholder as `Properties.TemplateURL`. An error from the callback
/// aborts the pass.
pub fn apply_nesting<F>(
    document: &Document,
    options: NestingOptions,
    mut locator: F,
) -> Result<Document>
where
    F: FnMut(&str, &Value) -> Result<String>,
{
    let mut doc = document.clone();
    let mut parameters: Mapping = match doc.get(&[PARAMETERS]) {
        Some(Node::Mapping(map)) => map.clone(),
        _ => Mapping::new(),
    };
    let mut output_map: IndexMap<String, (String, String)> = IndexMap::new();

    for stack_name in resource_names(&doc) {
        if !is_nested_stack(&doc, &stack_name) {
            continue;
        }
        let Some(nested) = doc
            .get(&[RESOURCES, stack_name.as_str(), "Properties", "Stack"])
            .cloned()
        else {
            continue;
        };

        remap::remap_nested_parameters(
            &mut doc,
            &mut parameters,
            &mut output_map,
            &stack_name,
            &nested,
        );

        // Detach the embedded template and swap in its remote locator.
        if let Some(properties) = doc
            .get_mut(&[RESOURCES, stack_name.as_str(), "Properties"])
            .and_then(Node::as_mapping_mut)
        {
            properties.shift_remove("Stack");
        }
        log::debug!("detaching nested stack '{stack_name}'");
        let url = locator(&stack_name, &nested.to_value())?;
        doc.set(
            &[RESOURCES, stack_name.as_str(), "Properties", "TemplateURL"],
            url,
        );
    }

    doc.set(&[PARAMETERS], Node::Mapping(parameters));

    if options.collect_outputs {
        let mut collected = Mapping::new();
        for (name, (stack, attribute)) in &output_map {
            let mut entry = Mapping::new();
            entry.insert(
                "Value".to_string(),
                Node::Intrinsic(Intrinsic::GetAtt(stack.clone(), attribute.clone())),
            );
            collected.insert(name.clone(), Node::Mapping(entry));
        }
        if matches!(doc.get(&[OUTPUTS]), Some(Node::Mapping(_))) {
            let existing = doc
                .get_mut(&[OUTPUTS])
                .and_then(Node::as_mapping_mut)
                .expect("checked to be a mapping above");
            for (name, value) in collected {
                existing.insert(name, value);
            }
        } else {
            doc.set(&[OUTPUTS], Node::Mapping(collected));
        }
    }

    Ok(doc)
}

/// Insert a nested-stack placeholder for a stored template.
///
/// The template id is resolved against the template root (double
/// underscore as directory separator; dashes in file names match
/// underscores). The placeholder's resource name is the id with
/// separators flattened to underscores, extended by `name_parts`. Returns
/// the resource name.
pub fn nest(
    paths: &TemplatePaths,
    template_id: &str,
    target: &mut Document,
    name_parts: &[&str],
) -> Result<String> {
    nest_refined(paths, template_id, target, name_parts, |_| {})
}

/// [`nest`], with a refinement applied to the placeholder resource.
pub fn nest_refined<F>(
    paths: &TemplatePaths,
    template_id: &str,
    target: &mut Document,
    name_parts: &[&str],
    refine: F,
) -> Result<String>
where
    F: Fn(&mut Node),
{
    let file = resolve_template(paths, template_id)?;
    let nested = load_document_file(&file)?;

    let mut resource_name = template_id.replace("__", "_").replace(['/', '-'], "_");
    for part in name_parts {
        resource_name.push('_');
        resource_name.push_str(part);
    }

    target.set(
        &[RESOURCES, resource_name.as_str(), "Type"],
        NESTED_STACK_TYPE,
    );
    target.set(
        &[RESOURCES, resource_name.as_str(), "Properties", "Stack"],
        Node::Mapping(nested.root().clone()),
    );
    let resource = target
        .get_mut(&[RESOURCES, resource_name.as_str()])
        .expect("placeholder resource created above");
    refine(resource);
    Ok(resource_name)
}

fn resource_names(document: &Document) -> Vec<String> {
    match document.get(&[RESOURCES]).and_then(Node::as_mapping) {
        Some(map) => map.keys().cloned().collect(),
        None => Vec::new(),
    }
}

fn is_nested_stack(document: &Document, resource_name: &str) -> bool {
    document
        .get(&[RESOURCES, resource_name, "Type"])
        .and_then(Node::as_str)
        == Some(NESTED_STACK_TYPE)
}
