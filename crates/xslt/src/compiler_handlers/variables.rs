//! Variables, parameters and sort keys.

use crate::ast::{
    GlobalVariable, Param, SortDataType, SortKey, SortOrder, VariableValue, WithParam,
};
use crate::compiler::{CompilerBuilder, is_xsl_named};
use crate::error::XsltError;
use crate::util::{compilation_error, get_attr_optional, get_attr_required};
use roxmltree::Node;
use xsltui_xpath1::parse_expression;

impl CompilerBuilder {
    /// The value of `xsl:variable`, `xsl:param` or `xsl:with-param`.
    pub(crate) fn compile_variable_value(&mut self, node: Node<'_, '_>) -> Result<VariableValue, XsltError> {
        if let Some(select) = get_attr_optional(node, "select") {
            return Ok(VariableValue::Select(parse_expression(select)?));
        }
        let body = self.compile_body(node)?;
        if body.0.is_empty() {
            Ok(VariableValue::Empty)
        } else {
            Ok(VariableValue::Content(body))
        }
    }

    /// Leading `xsl:param` children of a template.
    pub(crate) fn compile_params(&mut self, template: Node<'_, '_>) -> Result<Vec<Param>, XsltError> {
        let mut params = Vec::new();
        for child in template.children().filter(|n| is_xsl_named(*n, "param")) {
            params.push(Param {
                name: get_attr_required(child, "name")?.to_string(),
                default_value: self.compile_variable_value(child)?,
            });
        }
        Ok(params)
    }

    pub(crate) fn compile_with_params(&mut self, node: Node<'_, '_>) -> Result<Vec<WithParam>, XsltError> {
        let mut params = Vec::new();
        for child in node.children().filter(|n| is_xsl_named(*n, "with-param")) {
            params.push(WithParam {
                name: get_attr_required(child, "name")?.to_string(),
                value: self.compile_variable_value(child)?,
            });
        }
        Ok(params)
    }

    pub(crate) fn compile_sort_keys(&mut self, node: Node<'_, '_>) -> Result<Vec<SortKey>, XsltError> {
        let mut keys = Vec::new();
        for child in node.children().filter(|n| is_xsl_named(*n, "sort")) {
            let select = parse_expression(get_attr_optional(child, "select").unwrap_or("."))?;
            let order = match get_attr_optional(child, "order") {
                None | Some("ascending") => SortOrder::Ascending,
                Some("descending") => SortOrder::Descending,
                Some(other) => {
                    return Err(compilation_error(
                        child,
                        format!("Invalid sort order '{}'", other),
                    ));
                }
            };
            let data_type = match get_attr_optional(child, "data-type") {
                Some("number") => SortDataType::Number,
                None | Some("text") => SortDataType::Text,
                Some(other) => {
                    log::warn!("Unsupported sort data-type '{}', sorting as text.", other);
                    SortDataType::Text
                }
            };
            keys.push(SortKey {
                select,
                order,
                data_type,
            });
        }
        Ok(keys)
    }

    pub(crate) fn handle_global_variable(&mut self, node: Node<'_, '_>, is_param: bool) -> Result<(), XsltError> {
        let name = get_attr_required(node, "name")?.to_string();
        let value = self.compile_variable_value(node)?;
        self.stylesheet.global_variables.push(GlobalVariable {
            name,
            value,
            is_param,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{SortDataType, SortOrder, VariableValue, XsltInstruction};
    use crate::compiler::compile;

    #[test]
    fn test_sort_keys_and_params() {
        let compiled = compile(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
                 <xsl:param name="limit" select="3"/>
                 <xsl:variable name="empty"/>
                 <xsl:template match="/">
                   <xsl:apply-templates select="//item">
                     <xsl:sort select="@price" data-type="number" order="descending"/>
                     <xsl:sort/>
                     <xsl:with-param name="label">Price</xsl:with-param>
                   </xsl:apply-templates>
                 </xsl:template>
               </xsl:stylesheet>"#,
        )
        .unwrap();

        assert_eq!(compiled.global_variables.len(), 2);
        assert!(compiled.global_variables[0].is_param);
        assert_eq!(compiled.global_variables[1].value, VariableValue::Empty);

        let rule = &compiled.template_rules[&None][0];
        let XsltInstruction::ApplyTemplates {
            sort_keys, params, ..
        } = &rule.body.0[0]
        else {
            panic!("expected apply-templates, got {:?}", rule.body.0);
        };
        assert_eq!(sort_keys.len(), 2);
        assert_eq!(sort_keys[0].order, SortOrder::Descending);
        assert_eq!(sort_keys[0].data_type, SortDataType::Number);
        assert_eq!(sort_keys[1].data_type, SortDataType::Text);
        assert_eq!(params.len(), 1);
        assert!(matches!(params[0].value, VariableValue::Content(_)));
    }
}
