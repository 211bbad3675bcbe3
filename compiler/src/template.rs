//! Template declarations and their expansion into concrete sprites.

use std::collections::HashMap;
use std::ops::Range;

use log::trace;
use nml::block::template::TemplateDeclaration;
use nml::expression::{Expression, MAX_EXPRESSION_DEPTH, SpriteGroupRef};
use nml::sprite::{RealSprite, SpriteEntry, TemplateUsage};

use crate::error::{CompileError, CompileErrorKind};

const MAX_TEMPLATE_DEPTH: usize = 64;

/// Sprite numbers run from 0 to 0xFFFF, so no block can use more sprites.
pub const MAX_EXPANDED_SPRITES: usize = 0x1_0000;

/// Expression nodes one block's expansion may build, arguments included.
const MAX_EXPANDED_NODES: usize = 1 << 21;

/// Template uses one block's expansion may visit.
const MAX_TEMPLATE_USES: usize = 1 << 20;

#[derive(Debug, Default)]
pub struct TemplateTable {
    templates: HashMap<String, TemplateDeclaration>,
}

impl TemplateTable {
    pub fn new() -> Self {
        TemplateTable::default()
    }

    pub fn declare(&mut self, declaration: TemplateDeclaration) -> Result<(), CompileError> {
        if self.templates.contains_key(&declaration.name.value) {
            return Err(CompileError::new(
                CompileErrorKind::DuplicateName {
                    name: declaration.name.value.clone(),
                },
                declaration.name.span.clone(),
            ));
        }
        trace!(
            "declared template '{}' with {} parameter(s)",
            declaration.name.value,
            declaration.params.len()
        );
        self.templates
            .insert(declaration.name.value.clone(), declaration);
        Ok(())
    }

    /// Expand every template usage in `entries`, recursively, into real
    /// sprites. Order is preserved; the result length is final.
    ///
    /// Expansion stops with an error, located at the top-level entry being
    /// expanded, once it would exceed [`MAX_EXPANDED_SPRITES`] sprites or
    /// build expressions too large or too deep to evaluate.
    pub fn expand(&self, entries: &[SpriteEntry]) -> Result<Vec<RealSprite>, CompileError> {
        let mut expansion = Expansion {
            table: self,
            active: Vec::new(),
            out: Vec::new(),
            nodes_left: MAX_EXPANDED_NODES,
            uses_left: MAX_TEMPLATE_USES,
        };
        let no_bindings = HashMap::new();
        for entry in entries {
            expansion.entry(entry, &no_bindings, entry.span())?;
        }
        Ok(expansion.out)
    }
}

/// State of one block's expansion.
struct Expansion<'a> {
    table: &'a TemplateTable,
    /// Templates being expanded, outermost first.
    active: Vec<&'a str>,
    out: Vec<RealSprite>,
    nodes_left: usize,
    uses_left: usize,
}

impl<'a> Expansion<'a> {
    fn entry(
        &mut self,
        entry: &SpriteEntry,
        bindings: &HashMap<String, Expression>,
        root: &Range<usize>,
    ) -> Result<(), CompileError> {
        match entry {
            SpriteEntry::Real(sprite) => {
                if self.out.len() >= MAX_EXPANDED_SPRITES {
                    return Err(CompileError::new(
                        CompileErrorKind::Range {
                            what: "number of sprites after template expansion".into(),
                            min: 0,
                            max: MAX_EXPANDED_SPRITES as i64,
                            value: self.out.len() as i64 + 1,
                        },
                        root.clone(),
                    ));
                }
                let params = sprite
                    .params
                    .iter()
                    .map(|p| self.instantiate(p, bindings, root))
                    .collect::<Result<Vec<_>, _>>()?;
                self.out.push(RealSprite {
                    params,
                    span: sprite.span.clone(),
                });
                Ok(())
            }
            SpriteEntry::Template(usage) => self.usage(usage, bindings, root),
        }
    }

    fn usage(
        &mut self,
        usage: &TemplateUsage,
        bindings: &HashMap<String, Expression>,
        root: &Range<usize>,
    ) -> Result<(), CompileError> {
        let table = self.table;
        let (name, template) = table
            .templates
            .get_key_value(&usage.name.value)
            .ok_or_else(|| {
                CompileError::new(
                    CompileErrorKind::UnknownTemplate {
                        name: usage.name.value.clone(),
                    },
                    usage.name.span.clone(),
                )
            })?;

        if self.active.contains(&name.as_str()) || self.active.len() >= MAX_TEMPLATE_DEPTH {
            return Err(CompileError::new(
                CompileErrorKind::RecursiveTemplate { name: name.clone() },
                usage.span.clone(),
            ));
        }
        if template.params.len() != usage.args.len() {
            return Err(CompileError::new(
                CompileErrorKind::TemplateArity {
                    name: name.clone(),
                    expected: template.params.len(),
                    found: usage.args.len(),
                },
                usage.span.clone(),
            ));
        }
        self.uses_left = self
            .uses_left
            .checked_sub(1)
            .ok_or_else(|| expansion_limit(MAX_TEMPLATE_USES, "template uses", root))?;

        // Arguments are evaluated in the caller's bindings, then bound to the
        // template's own parameter names.
        let mut inner = HashMap::with_capacity(template.params.len());
        for (param, arg) in template.params.iter().zip(&usage.args) {
            inner.insert(param.value.clone(), self.instantiate(arg, bindings, root)?);
        }

        self.active.push(name.as_str());
        let result = template
            .sprites
            .iter()
            .try_for_each(|entry| self.entry(entry, &inner, root));
        self.active.pop();
        result
    }

    /// Substitute `bindings` into `expr`, keeping the result within the
    /// node budget and the evaluator's depth limit.
    fn instantiate(
        &mut self,
        expr: &Expression,
        bindings: &HashMap<String, Expression>,
        root: &Range<usize>,
    ) -> Result<Expression, CompileError> {
        let (result, depth) = substitute(expr, bindings, &mut self.nodes_left)
            .ok_or_else(|| expansion_limit(MAX_EXPANDED_NODES, "expression nodes", root))?;
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(expansion_limit(
                MAX_EXPRESSION_DEPTH,
                "levels of expression nesting",
                root,
            ));
        }
        Ok(result)
    }
}

fn expansion_limit(limit: usize, what: &'static str, span: &Range<usize>) -> CompileError {
    CompileError::new(CompileErrorKind::ExpansionLimit { limit, what }, span.clone())
}

fn take(nodes_left: &mut usize, count: usize) -> Option<()> {
    *nodes_left = nodes_left.checked_sub(count)?;
    Some(())
}

/// Replace identifiers bound in `bindings` by their bound expressions.
/// Returns the result and its depth, or `None` once `nodes_left` runs out.
/// Bound expressions are never deeper than [`MAX_EXPRESSION_DEPTH`].
fn substitute(
    expr: &Expression,
    bindings: &HashMap<String, Expression>,
    nodes_left: &mut usize,
) -> Option<(Expression, usize)> {
    match expr {
        Expression::Identifier(ident) => match bindings.get(&ident.value) {
            Some(bound) => {
                take(nodes_left, bound.node_count())?;
                Some((bound.clone(), bound.depth()))
            }
            None => {
                take(nodes_left, 1)?;
                Some((expr.clone(), 1))
            }
        },
        Expression::ConstantNumeric(..) | Expression::StringLiteral(..) => {
            take(nodes_left, 1)?;
            Some((expr.clone(), 1))
        }
        Expression::SpriteGroupRef(reference) => {
            take(nodes_left, 1)?;
            let mut params = Vec::with_capacity(reference.params().len());
            let mut depth = 0;
            for param in reference.params() {
                let (param, param_depth) = substitute(param, bindings, nodes_left)?;
                depth = depth.max(param_depth);
                params.push(param);
            }
            let reference =
                SpriteGroupRef::new(reference.name().clone(), params, reference.span().clone());
            Some((Expression::SpriteGroupRef(reference), depth + 1))
        }
        Expression::UnaryOperation {
            operator,
            operand,
            span,
        } => {
            take(nodes_left, 1)?;
            let (operand, depth) = substitute(operand, bindings, nodes_left)?;
            let expr = Expression::UnaryOperation {
                operator: *operator,
                operand: Box::new(operand),
                span: span.clone(),
            };
            Some((expr, depth + 1))
        }
        Expression::BinaryOperation {
            operator,
            left,
            right,
            span,
        } => {
            take(nodes_left, 1)?;
            let (left, left_depth) = substitute(left, bindings, nodes_left)?;
            let (right, right_depth) = substitute(right, bindings, nodes_left)?;
            let expr = Expression::BinaryOperation {
                operator: *operator,
                left: Box::new(left),
                right: Box::new(right),
                span: span.clone(),
            };
            Some((expr, left_depth.max(right_depth) + 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use nml::expression::{BinaryOperator, Identifier};

    use super::*;
    use crate::reduce::reduce_constant;

    fn ident_expr(name: &str) -> Expression {
        Expression::Identifier(Identifier::new(name, 0..name.len()))
    }

    fn num(n: i64) -> Expression {
        Expression::ConstantNumeric(n, 0..1)
    }

    fn template(name: &str, params: &[&str], sprites: Vec<SpriteEntry>) -> TemplateDeclaration {
        TemplateDeclaration {
            name: Identifier::new(name, 9..9 + name.len()),
            params: params
                .iter()
                .map(|p| Identifier::new(*p, 0..p.len()))
                .collect(),
            sprites,
            span: 0..40,
        }
    }

    fn usage(name: &str, args: Vec<Expression>) -> SpriteEntry {
        SpriteEntry::Template(TemplateUsage {
            name: Identifier::new(name, 20..20 + name.len()),
            args,
            span: 20..30,
        })
    }

    fn real(params: Vec<Expression>) -> SpriteEntry {
        SpriteEntry::Real(RealSprite { params, span: 0..10 })
    }

    #[test]
    fn substitutes_parameters() {
        let mut table = TemplateTable::new();
        table
            .declare(template(
                "tmpl",
                &["x"],
                vec![
                    real(vec![ident_expr("x"), num(0)]),
                    real(vec![ident_expr("x"), num(1)]),
                ],
            ))
            .unwrap();

        let sprites = table.expand(&[usage("tmpl", vec![num(42)])]).unwrap();
        assert_eq!(sprites.len(), 2);
        assert_eq!(reduce_constant(&sprites[0].params[0]).unwrap(), 42);
        assert_eq!(reduce_constant(&sprites[1].params[1]).unwrap(), 1);
    }

    #[test]
    fn nested_templates_bind_in_caller_scope() {
        let mut table = TemplateTable::new();
        table
            .declare(template("inner", &["y"], vec![real(vec![ident_expr("y")])]))
            .unwrap();
        table
            .declare(template(
                "outer",
                &["y"],
                vec![usage("inner", vec![ident_expr("y")]), real(vec![num(7)])],
            ))
            .unwrap();

        let sprites = table.expand(&[usage("outer", vec![num(3)])]).unwrap();
        assert_eq!(sprites.len(), 2);
        assert_eq!(reduce_constant(&sprites[0].params[0]).unwrap(), 3);
    }

    #[test]
    fn recursion_is_an_error() {
        let mut table = TemplateTable::new();
        table
            .declare(template("loop", &[], vec![usage("loop", vec![])]))
            .unwrap();
        let err = table.expand(&[usage("loop", vec![])]).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::RecursiveTemplate { .. }));
    }

    #[test]
    fn unknown_template_and_wrong_arity() {
        let mut table = TemplateTable::new();
        table
            .declare(template("t", &["a", "b"], vec![real(vec![])]))
            .unwrap();

        let err = table.expand(&[usage("nope", vec![])]).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::UnknownTemplate { .. }));

        let err = table.expand(&[usage("t", vec![num(1)])]).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::TemplateArity {
                name: "t".into(),
                expected: 2,
                found: 1,
            }
        );
    }

    fn add(left: Expression, right: Expression) -> Expression {
        Expression::BinaryOperation {
            operator: BinaryOperator::Addition,
            left: Box::new(left),
            right: Box::new(right),
            span: 0..1,
        }
    }

    /// `t0` holds `base`; every `tN` uses `t(N-1)` twice with `arg(x)`.
    fn doubling_chain(levels: usize, base: Vec<SpriteEntry>, arg: fn() -> Expression) -> TemplateTable {
        let mut table = TemplateTable::new();
        table.declare(template("t0", &["x"], base)).unwrap();
        for level in 1..=levels {
            let prev = format!("t{}", level - 1);
            table
                .declare(template(
                    &format!("t{}", level),
                    &["x"],
                    vec![usage(&prev, vec![arg()]), usage(&prev, vec![arg()])],
                ))
                .unwrap();
        }
        table
    }

    #[test]
    fn sprite_fan_out_stops_at_the_slot_limit() {
        let table = doubling_chain(30, vec![real(vec![ident_expr("x")])], || ident_expr("x"));
        let top = SpriteEntry::Template(TemplateUsage {
            name: Identifier::new("t30", 50..53),
            args: vec![num(1)],
            span: 50..56,
        });
        let err = table.expand(&[top]).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::Range {
                what: "number of sprites after template expansion".into(),
                min: 0,
                max: 0x1_0000,
                value: 0x1_0001,
            }
        );
        assert_eq!(err.span, Some(50..56));
    }

    #[test]
    fn empty_fan_out_stops_at_the_use_limit() {
        let table = doubling_chain(40, vec![], || ident_expr("x"));
        let err = table.expand(&[usage("t40", vec![num(1)])]).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::ExpansionLimit {
                limit: MAX_TEMPLATE_USES,
                what: "template uses",
            }
        );
    }

    #[test]
    fn argument_growth_stops_at_the_node_limit() {
        let table = doubling_chain(30, vec![real(vec![ident_expr("x")])], || {
            add(ident_expr("x"), ident_expr("x"))
        });
        let err = table.expand(&[usage("t30", vec![num(1)])]).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::ExpansionLimit {
                limit: MAX_EXPANDED_NODES,
                what: "expression nodes",
            }
        );
    }

    #[test]
    fn substitution_depth_is_bounded() {
        // x + 1 + 1 + ... nested 200 deep, with x bound to an equally deep argument.
        let mut body = ident_expr("x");
        let mut arg = num(0);
        for _ in 0..200 {
            body = add(body, num(1));
            arg = add(arg, num(1));
        }
        let mut table = TemplateTable::new();
        table
            .declare(template("deep", &["x"], vec![real(vec![body])]))
            .unwrap();
        let err = table.expand(&[usage("deep", vec![arg])]).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::ExpansionLimit {
                limit: MAX_EXPRESSION_DEPTH,
                what: "levels of expression nesting",
            }
        );
    }

    #[test]
    fn duplicate_declaration() {
        let mut table = TemplateTable::new();
        table.declare(template("t", &[], vec![])).unwrap();
        let err = table.declare(template("t", &[], vec![])).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::DuplicateName { .. }));
        assert_eq!(err.span, Some(9..10));
    }
}
