use super::Visit;
use hcl::{
    expr::FuncCall,
    template::{Directive, Element},
    Expression, Operation, Template, TraversalOperator,
};

/// Recursively visit all [hcl::FuncCall]s
///
/// Function calls nested in arguments of other calls are visited after their parent.
pub trait VisitFuncCalls {
    fn visit_func_calls(&self, visitor: &mut dyn Visit<FuncCall>);
}

impl VisitFuncCalls for Expression {
    fn visit_func_calls(&self, visitor: &mut dyn Visit<FuncCall>) {
        match self {
            Expression::FuncCall(func_call) => {
                visitor.visit(func_call);
                for arg in &func_call.args {
                    arg.visit_func_calls(visitor);
                }
            }
            Expression::Traversal(traversal) => {
                traversal.expr.visit_func_calls(visitor);
                for operator in &traversal.operators {
                    if let TraversalOperator::Index(index) = operator {
                        index.visit_func_calls(visitor);
                    }
                }
            }
            Expression::Array(array) => {
                for expr in array {
                    expr.visit_func_calls(visitor);
                }
            }
            Expression::Object(object) => {
                for value in object.values() {
                    value.visit_func_calls(visitor);
                }
            }
            Expression::TemplateExpr(template_expr) => {
                // a template that does not parse has nothing we could match on
                if let Ok(template) = Template::from_expr(template_expr) {
                    template.visit_func_calls(visitor);
                }
            }
            Expression::Parenthesis(expr) => {
                expr.visit_func_calls(visitor);
            }
            Expression::Conditional(cond) => {
                cond.cond_expr.visit_func_calls(visitor);
                cond.true_expr.visit_func_calls(visitor);
                cond.false_expr.visit_func_calls(visitor);
            }
            Expression::Operation(operation) => match operation.as_ref() {
                Operation::Binary(binop) => {
                    binop.lhs_expr.visit_func_calls(visitor);
                    binop.rhs_expr.visit_func_calls(visitor);
                }
                Operation::Unary(unop) => {
                    unop.expr.visit_func_calls(visitor);
                }
            },
            Expression::ForExpr(forexpr) => {
                forexpr.collection_expr.visit_func_calls(visitor);
                forexpr
                    .key_expr
                    .iter()
                    .for_each(|e| e.visit_func_calls(visitor));
                forexpr.value_expr.visit_func_calls(visitor);
                forexpr
                    .cond_expr
                    .iter()
                    .for_each(|e| e.visit_func_calls(visitor));
            }
            _ => {}
        }
    }
}

impl VisitFuncCalls for Template {
    fn visit_func_calls(&self, visitor: &mut dyn Visit<FuncCall>) {
        for element in self.elements() {
            match element {
                Element::Interpolation(interpolation) => {
                    interpolation.expr.visit_func_calls(visitor);
                }
                Element::Directive(directive) => match directive {
                    Directive::If(ifdir) => {
                        ifdir.cond_expr.visit_func_calls(visitor);
                        ifdir.true_template.visit_func_calls(visitor);
                        ifdir
                            .false_template
                            .iter()
                            .for_each(|t| t.visit_func_calls(visitor));
                    }
                    Directive::For(fordir) => {
                        fordir.collection_expr.visit_func_calls(visitor);
                        fordir.template.visit_func_calls(visitor);
                    }
                },
                Element::Literal(_) => {}
            }
        }
    }
}
