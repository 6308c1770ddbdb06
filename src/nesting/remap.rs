//! Parameter remapping for the nesting pass.

use crate::document::{Document, Intrinsic, Mapping, Node, OUTPUTS, PARAMETERS, RESOURCES};
use indexmap::IndexMap;

/// Marker on a nested parameter forcing a per-stack-instance top-level
/// parameter instead of sharing by name.
const STACK_UNIQUE: &str = "StackUnique";

/// Parameter type that takes the comma Join fix-up when sourced from a
/// parameter.
const COMMA_DELIMITED_LIST: &str = "CommaDelimitedList";

/// Wire one nested stack's parameters and register its outputs.
///
/// Each declared parameter resolves against, in priority order: an
/// existing top-level parameter, a previously registered sibling output,
/// or a newly minted top-level parameter copied from its own spec. The
/// wiring lands on the top-level stack resource's `Properties.Parameters`
/// mapping, never inside the embedded template.
pub(crate) fn remap_nested_parameters(
    doc: &mut Document,
    parameters: &mut Mapping,
    output_map: &mut IndexMap<String, (String, String)>,
    stack_name: &str,
    nested: &Node,
) {
    if let Some(stack_parameters) = nested.get(&[PARAMETERS]).and_then(Node::as_mapping) {
        for (param_name, param_spec) in stack_parameters {
            let stack_unique = param_spec
                .get(&[STACK_UNIQUE])
                .is_some_and(Node::is_truthy);
            let check_name = if stack_unique {
                format!("{stack_name}{param_name}")
            } else {
                param_name.clone()
            };

            let wired = if let Some(existing) = parameters.get(&check_name) {
                ref_or_join(existing, &check_name)
            } else if let Some((stack, attribute)) = output_map.get(&check_name) {
                // Output-sourced wiring never takes the list fix-up.
                Node::Intrinsic(Intrinsic::GetAtt(stack.clone(), attribute.clone()))
            } else {
                let wired = ref_or_join(param_spec, &check_name);
                parameters.insert(check_name.clone(), param_spec.clone());
                wired
            };

            doc.set(
                &[
                    RESOURCES,
                    stack_name,
                    "Properties",
                    PARAMETERS,
                    param_name.as_str(),
                ],
                wired,
            );
        }
    }

    if let Some(outputs) = nested.get(&[OUTPUTS]).and_then(Node::as_mapping) {
        for output_name in outputs.keys() {
            output_map.insert(
                output_name.clone(),
                (stack_name.to_string(), format!("Outputs.{output_name}")),
            );
        }
    }
}

/// Plain `Ref`, or `Join(",", [Ref])` when the parameter spec declares the
/// comma-delimited list type. An untyped spec takes the plain branch.
fn ref_or_join(spec: &Node, check_name: &str) -> Node {
    let is_list = spec.get(&["Type"]).and_then(Node::as_str) == Some(COMMA_DELIMITED_LIST);
    let reference = Node::Intrinsic(Intrinsic::Ref(check_name.to_string()));
    if is_list {
        Node::Intrinsic(Intrinsic::Join(",".to_string(), vec![reference]))
    } else {
        reference
    }
}
