//! View particle tree.
//!
//! The trailing JSX expression of a component body lowers into this closed
//! tree. Every dynamic part (attribute, text content, branch condition, loop
//! source, provider value) carries its own dependency record; the tree's
//! aggregate read mask feeds the owning component's used-bits.

use oxc_ast::ast::{
    Expression, JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXChild, JSXElement,
    JSXElementName, JSXFragment, JSXMemberExpression, JSXMemberExpressionObject, Statement,
};
use oxc_span::GetSpan;
use oxc_syntax::operator::LogicalOperator;
use serde::Serialize;

use crate::builder::collect_pattern_names;
use crate::deps::extract_expression;
use crate::diagnostics::Diagnostic;
use crate::ir::{ComponentArena, ComponentId, Dependency, TextSpan};

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewParticle {
    Element(ElementParticle),
    Text(TextParticle),
    Expression(ExpressionParticle),
    Conditional(ConditionalParticle),
    Loop(LoopParticle),
    Env(EnvParticle),
    Component(ComponentParticle),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementParticle {
    pub tag: String,
    pub attributes: Vec<ViewAttribute>,
    pub children: Vec<ViewParticle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextParticle {
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionParticle {
    pub span: TextSpan,
    pub deps: Option<Dependency>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalParticle {
    pub test: TextSpan,
    pub deps: Option<Dependency>,
    pub consequent: Vec<ViewParticle>,
    pub alternate: Vec<ViewParticle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopParticle {
    pub source_span: TextSpan,
    pub deps: Option<Dependency>,
    /// Callback parameter names (item, index), shadowing the outer scope
    /// inside the body.
    pub params: Vec<String>,
    pub body: Vec<ViewParticle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvParticle {
    pub key: String,
    pub value: Option<DynAttr>,
    pub children: Vec<ViewParticle>,
}

/// Usage site of a sub-component (or imported component); its dynamic props
/// require parent-side prop writers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentParticle {
    pub name: String,
    pub attributes: Vec<ViewAttribute>,
    pub children: Vec<ViewParticle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewAttribute {
    pub name: String,
    pub value: AttrValue,
}

impl ViewAttribute {
    pub fn is_handler(&self) -> bool {
        self.name.starts_with("on")
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Static(String),
    /// Bare attribute with no value (`<input disabled />`).
    Flag,
    Dynamic(DynAttr),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynAttr {
    pub span: TextSpan,
    pub deps: Option<Dependency>,
}

/// Result of lowering a view expression: the particle tree, the OR of every
/// non-handler read mask in it, and any resolution diagnostics.
pub struct LoweredView {
    pub particles: Vec<ViewParticle>,
    pub used_bits: u64,
    pub diagnostics: Vec<Diagnostic>,
}

struct ViewLowering<'c> {
    arena: &'c ComponentArena,
    component: ComponentId,
    source: &'c str,
    file: &'c str,
    diagnostics: Vec<Diagnostic>,
    used_bits: u64,
    locals: Vec<String>,
}

pub fn lower_view(
    arena: &ComponentArena,
    component: ComponentId,
    source: &str,
    file: &str,
    expr: &Expression<'_>,
) -> LoweredView {
    let mut lowering = ViewLowering {
        arena,
        component,
        source,
        file,
        diagnostics: Vec::new(),
        used_bits: 0,
        locals: Vec::new(),
    };
    let particles = lowering.lower_expression(expr);
    LoweredView {
        particles,
        used_bits: lowering.used_bits,
        diagnostics: lowering.diagnostics,
    }
}

impl<'c> ViewLowering<'c> {
    fn extract(&mut self, expr: &Expression<'_>, observed: bool) -> Option<Dependency> {
        let extraction = extract_expression(
            expr,
            self.arena,
            self.component,
            &self.locals,
            self.source,
            self.file,
        );
        self.diagnostics.extend(extraction.diagnostics);
        if observed {
            if let Some(deps) = &extraction.deps {
                self.used_bits |= deps.mask;
            }
        }
        extraction.deps
    }

    fn lower_expression(&mut self, expr: &Expression<'_>) -> Vec<ViewParticle> {
        match expr {
            Expression::JSXElement(el) => vec![self.lower_element(el)],
            Expression::JSXFragment(frag) => self.lower_fragment(frag),
            Expression::ParenthesizedExpression(paren) => {
                self.lower_expression(&paren.expression)
            }
            Expression::ConditionalExpression(cond) => {
                let deps = self.extract(&cond.test, true);
                let consequent = self.lower_expression(&cond.consequent);
                let alternate = self.lower_expression(&cond.alternate);
                vec![ViewParticle::Conditional(ConditionalParticle {
                    test: cond.test.span().into(),
                    deps,
                    consequent,
                    alternate,
                })]
            }
            Expression::LogicalExpression(logical)
                if logical.operator == LogicalOperator::And =>
            {
                let deps = self.extract(&logical.left, true);
                let consequent = self.lower_expression(&logical.right);
                vec![ViewParticle::Conditional(ConditionalParticle {
                    test: logical.left.span().into(),
                    deps,
                    consequent,
                    alternate: Vec::new(),
                })]
            }
            Expression::CallExpression(call) => {
                if let Some(particle) = self.try_lower_loop(call) {
                    return vec![particle];
                }
                let deps = self.extract(expr, true);
                vec![ViewParticle::Expression(ExpressionParticle {
                    span: expr.span().into(),
                    deps,
                })]
            }
            _ => {
                let deps = self.extract(expr, true);
                vec![ViewParticle::Expression(ExpressionParticle {
                    span: expr.span().into(),
                    deps,
                })]
            }
        }
    }

    /// `xs.map((item, i) => <li/>)` is the loop shape the front end hands us.
    fn try_lower_loop(&mut self, call: &oxc_ast::ast::CallExpression<'_>) -> Option<ViewParticle> {
        let Expression::StaticMemberExpression(member) = &call.callee else {
            return None;
        };
        if member.property.name != "map" {
            return None;
        }
        let arg = call.arguments.first()?.as_expression()?;
        let Expression::ArrowFunctionExpression(arrow) = arg else {
            return None;
        };

        let deps = self.extract(&member.object, true);

        let mut params = Vec::new();
        for param in &arrow.params.items {
            collect_pattern_names(&param.pattern, &mut params);
        }

        let before = self.locals.len();
        self.locals.extend(params.iter().cloned());
        let body = match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) if arrow.body.statements.len() == 1 => {
                self.lower_expression(&stmt.expression)
            }
            Some(Statement::ReturnStatement(ret)) => match &ret.argument {
                Some(returned) => self.lower_expression(returned),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        self.locals.truncate(before);

        Some(ViewParticle::Loop(LoopParticle {
            source_span: member.object.span().into(),
            deps,
            params,
            body,
        }))
    }

    fn lower_fragment(&mut self, fragment: &JSXFragment<'_>) -> Vec<ViewParticle> {
        let mut out = Vec::new();
        for child in &fragment.children {
            self.lower_child(child, &mut out);
        }
        out
    }

    fn lower_child(&mut self, child: &JSXChild<'_>, out: &mut Vec<ViewParticle>) {
        match child {
            JSXChild::Text(t) => {
                let text = t.value.trim();
                if !text.is_empty() {
                    out.push(ViewParticle::Text(TextParticle {
                        value: text.to_string(),
                    }));
                }
            }
            JSXChild::Element(el) => out.push(self.lower_element(el)),
            JSXChild::Fragment(frag) => out.extend(self.lower_fragment(frag)),
            JSXChild::ExpressionContainer(container) => {
                if let Some(expr) = container.expression.as_expression() {
                    out.extend(self.lower_expression(expr));
                }
            }
            JSXChild::Spread(spread) => {
                let deps = self.extract(&spread.expression, true);
                out.push(ViewParticle::Expression(ExpressionParticle {
                    span: spread.expression.span().into(),
                    deps,
                }));
            }
        }
    }

    fn lower_element(&mut self, element: &JSXElement<'_>) -> ViewParticle {
        let tag = get_tag_name(&element.opening_element.name);

        let mut attributes = Vec::new();
        for item in &element.opening_element.attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(id) => id.name.to_string(),
                        JSXAttributeName::NamespacedName(ns) => {
                            format!("{}:{}", ns.namespace.name, ns.name.name)
                        }
                    };
                    let is_handler = name.starts_with("on");
                    let value = match &attr.value {
                        None => AttrValue::Flag,
                        Some(JSXAttributeValue::StringLiteral(s)) => {
                            AttrValue::Static(s.value.to_string())
                        }
                        Some(JSXAttributeValue::ExpressionContainer(container)) => {
                            match container.expression.as_expression() {
                                Some(expr) => {
                                    // Handler reads stay untracked: listeners
                                    // read live values at call time.
                                    let deps = self.extract(expr, !is_handler);
                                    AttrValue::Dynamic(DynAttr {
                                        span: expr.span().into(),
                                        deps,
                                    })
                                }
                                None => AttrValue::Flag,
                            }
                        }
                        Some(JSXAttributeValue::Element(el)) => AttrValue::Dynamic(DynAttr {
                            span: el.span.into(),
                            deps: None,
                        }),
                        Some(JSXAttributeValue::Fragment(frag)) => AttrValue::Dynamic(DynAttr {
                            span: frag.span.into(),
                            deps: None,
                        }),
                    };
                    attributes.push(ViewAttribute { name, value });
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    let deps = self.extract(&spread.argument, true);
                    attributes.push(ViewAttribute {
                        name: "...".to_string(),
                        value: AttrValue::Dynamic(DynAttr {
                            span: spread.argument.span().into(),
                            deps,
                        }),
                    });
                }
            }
        }

        let mut children = Vec::new();
        for child in &element.children {
            self.lower_child(child, &mut children);
        }

        if let Some(key) = tag.strip_suffix(".Provider") {
            let value = attributes.into_iter().find_map(|attr| {
                if attr.name == "value" {
                    match attr.value {
                        AttrValue::Dynamic(dyn_attr) => Some(dyn_attr),
                        _ => None,
                    }
                } else {
                    None
                }
            });
            return ViewParticle::Env(EnvParticle {
                key: key.to_string(),
                value,
                children,
            });
        }

        if tag.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return ViewParticle::Component(ComponentParticle {
                name: tag,
                attributes,
                children,
            });
        }

        ViewParticle::Element(ElementParticle {
            tag,
            attributes,
            children,
        })
    }
}

fn get_tag_name(name: &JSXElementName<'_>) -> String {
    match name {
        JSXElementName::Identifier(id) => id.name.to_string(),
        JSXElementName::IdentifierReference(id) => id.name.to_string(),
        JSXElementName::NamespacedName(ns) => format!("{}:{}", ns.namespace.name, ns.name.name),
        JSXElementName::MemberExpression(me) => get_member_name(me),
        JSXElementName::ThisExpression(_) => "this".to_string(),
    }
}

fn get_member_name(me: &JSXMemberExpression<'_>) -> String {
    let object = match &me.object {
        JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
        JSXMemberExpressionObject::MemberExpression(inner) => get_member_name(inner),
        _ => "unknown".to_string(),
    };
    format!("{}.{}", object, me.property.name)
}
