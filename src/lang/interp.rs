//! Tree-walking evaluator for the submission subset.
//!
//! Exceptions are ordinary error values (`EvalResult`), never panics;
//! `break`/`continue`/`return` travel as [`Flow`] so they cannot escape
//! their statement context.

use std::cell::RefCell;
use std::rc::Rc;

use crate::lang::ast::{
    BinOp, BoolOp, Expr, ExprKind, Index, Module, Param, Stmt, StmtKind, Target,
};
use crate::lang::builtins::sandbox_globals;
use crate::lang::calls;
use crate::lang::methods;
use crate::lang::ops;
use crate::lang::value::{
    ClassType, EvalResult, ExcType, FunctionBody, FunctionValue, IterState, PyExc, Scope, Value,
};

/// Mirrors the source language's default recursion limit.
const MAX_CALL_DEPTH: usize = 1000;

#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interp {
    pub globals: Rc<Scope>,
    call_depth: usize,
    max_call_depth: usize,
    /// Sink for `print`; the worker discards it, tests inspect it.
    pub stdout: Vec<u8>,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    pub fn new() -> Self {
        Self {
            globals: Scope::root(sandbox_globals()),
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
            stdout: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_max_depth(max_call_depth: usize) -> Self {
        Self {
            max_call_depth,
            ..Self::new()
        }
    }

    /// Evaluate a whole submission in the sandbox globals.
    pub fn run_module(&mut self, module: &Module) -> EvalResult<()> {
        let globals = Rc::clone(&self.globals);
        match self.exec_block(&module.body, &globals)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(PyExc::new(
                ExcType::RuntimeError,
                "'return' outside function",
            )),
            Flow::Break | Flow::Continue => Err(PyExc::new(
                ExcType::RuntimeError,
                "'break' or 'continue' outside loop",
            )),
        }
    }

    /// Top-level name lookup, used to locate the entry point.
    pub fn global_lookup(&self, name: &str) -> Option<Value> {
        self.globals.vars.borrow().get(name).cloned()
    }

    // ---- statements ----------------------------------------------------

    pub(crate) fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> EvalResult<Flow> {
        match &stmt.kind {
            StmtKind::FunctionDef { name, params, body } => {
                let function = self.make_function(name, params, scope, || {
                    FunctionBody::Block(Rc::new(body.clone()))
                })?;
                scope.assign(name, function);
                Ok(Flow::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::If { branches, orelse } => {
                for (test, body) in branches {
                    if self.eval(test, scope)?.truthy() {
                        return self.exec_block(body, scope);
                    }
                }
                self.exec_block(orelse, scope)
            }
            StmtKind::While { test, body } => {
                while self.eval(test, scope)?.truthy() {
                    match self.exec_block(body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter, scope)?;
                let state = self.iter_state_of(&iterable)?;
                loop {
                    let item = state.borrow_mut().next_item();
                    let Some(item) = item else { break };
                    self.assign_target(target, item, scope)?;
                    match self.exec_block(body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value, scope)?;
                for target in targets {
                    self.assign_target(target, value.clone(), scope)?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::AugAssign { target, op, value } => {
                self.exec_aug_assign(target, *op, value, scope)?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            StmtKind::Pass => Ok(Flow::Normal),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Import { module } => Err(PyExc::new(
                ExcType::ImportError,
                format!("import of '{}' is not allowed in the sandbox", module),
            )),
            StmtKind::Raise { exc } => Err(self.make_raise(exc.as_ref(), scope)?),
            StmtKind::Try {
                body,
                handlers,
                finally,
            } => self.exec_try(body, handlers, finally, scope),
        }
    }

    fn make_function(
        &mut self,
        name: &str,
        params: &[Param],
        scope: &Rc<Scope>,
        body: impl FnOnce() -> FunctionBody,
    ) -> EvalResult<Value> {
        let mut defaults = Vec::with_capacity(params.len());
        for param in params {
            defaults.push(match &param.default {
                Some(expr) => Some(self.eval(expr, scope)?),
                None => None,
            });
        }
        Ok(Value::Function(Rc::new(FunctionValue {
            name: name.to_string(),
            params: params.to_vec(),
            defaults,
            body: body(),
            closure: Rc::clone(scope),
        })))
    }

    fn make_raise(&mut self, exc: Option<&Expr>, scope: &Rc<Scope>) -> EvalResult<PyExc> {
        let Some(expr) = exc else {
            return Ok(PyExc::new(
                ExcType::RuntimeError,
                "No active exception to re-raise",
            ));
        };
        match self.eval(expr, scope)? {
            Value::Exception(exc) => Ok((*exc).clone()),
            Value::Class(ClassType::Exc(ty)) => Ok(PyExc::new(ty, "")),
            other => Ok(PyExc::type_error(format!(
                "exceptions must derive from BaseException, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[crate::lang::ast::ExceptHandler],
        finally: &[Stmt],
        scope: &Rc<Scope>,
    ) -> EvalResult<Flow> {
        let outcome = match self.exec_block(body, scope) {
            Err(exc) => self.dispatch_handler(handlers, exc, scope),
            ok => ok,
        };

        if !finally.is_empty() {
            match self.exec_block(finally, scope) {
                Ok(Flow::Normal) => {}
                // The finally block's own exit wins over the try outcome.
                other => return other,
            }
        }
        outcome
    }

    fn dispatch_handler(
        &mut self,
        handlers: &[crate::lang::ast::ExceptHandler],
        exc: PyExc,
        scope: &Rc<Scope>,
    ) -> EvalResult<Flow> {
        for handler in handlers {
            let mut matched = handler.classes.is_empty();
            for class_expr in &handler.classes {
                match self.eval(class_expr, scope)? {
                    Value::Class(ClassType::Exc(ty)) => {
                        if exc.ty.is_caught_by(ty) {
                            matched = true;
                            break;
                        }
                    }
                    other => {
                        return Err(PyExc::type_error(format!(
                            "catching classes that do not inherit from BaseException is not \
                             allowed, got '{}'",
                            other.type_name()
                        )));
                    }
                }
            }
            if matched {
                if let Some(binding) = &handler.binding {
                    scope.assign(binding, Value::Exception(Rc::new(exc)));
                }
                return self.exec_block(&handler.body, scope);
            }
        }
        Err(exc)
    }

    fn exec_aug_assign(
        &mut self,
        target: &Target,
        op: BinOp,
        value: &Expr,
        scope: &Rc<Scope>,
    ) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                let current = scope
                    .lookup(name)
                    .ok_or_else(|| PyExc::name_error(name))?;
                let rhs = self.eval(value, scope)?;
                let updated = aug_value(op, current, rhs)?;
                scope.assign(name, updated);
                Ok(())
            }
            Target::Subscript { obj, index } => {
                let container = self.eval(obj, scope)?;
                let key = self.eval(index, scope)?;
                let current = ops::get_index(&container, &key)?;
                let rhs = self.eval(value, scope)?;
                let updated = aug_value(op, current, rhs)?;
                ops::set_index(&container, key, updated)
            }
            Target::Tuple(_) => Err(PyExc::type_error("invalid augmented assignment target")),
        }
    }

    pub(crate) fn assign_target(
        &mut self,
        target: &Target,
        value: Value,
        scope: &Rc<Scope>,
    ) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                scope.assign(name, value);
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = ops::iter_to_vec(&value)?;
                if items.len() < targets.len() {
                    return Err(PyExc::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(PyExc::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign_target(target, item, scope)?;
                }
                Ok(())
            }
            Target::Subscript { obj, index } => {
                let container = self.eval(obj, scope)?;
                let key = self.eval(index, scope)?;
                ops::set_index(&container, key, value)
            }
        }
    }

    // ---- expressions ---------------------------------------------------

    pub(crate) fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::NoneLit => Ok(Value::None),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Imag(im) => Ok(Value::Complex { re: 0.0, im: *im }),
            ExprKind::Str(s) => Ok(Value::str(s.clone())),
            ExprKind::Bytes(b) => Ok(Value::Bytes(Rc::new(b.clone()))),
            ExprKind::Name(name) => scope
                .lookup(name)
                .ok_or_else(|| PyExc::name_error(name)),
            ExprKind::List(items) => {
                let values = self.eval_all(items, scope)?;
                Ok(Value::list(values))
            }
            ExprKind::Tuple(items) => {
                let values = self.eval_all(items, scope)?;
                Ok(Value::tuple(values))
            }
            ExprKind::Set(items) => {
                let values = self.eval_all(items, scope)?;
                Ok(Value::set(ops::dedup_set_items(values)?))
            }
            ExprKind::Dict(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.eval(key_expr, scope)?;
                    let value = self.eval(value_expr, scope)?;
                    pairs.push((key, value));
                }
                Ok(Value::dict(ops::build_dict(pairs)?))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                ops::unary_op(*op, &value)
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                ops::binary_op(*op, &left, &right)
            }
            ExprKind::BoolChain { op, values } => {
                let mut last = Value::None;
                for (i, value_expr) in values.iter().enumerate() {
                    last = self.eval(value_expr, scope)?;
                    let is_last = i == values.len() - 1;
                    if !is_last {
                        match op {
                            BoolOp::And if !last.truthy() => return Ok(last),
                            BoolOp::Or if last.truthy() => return Ok(last),
                            _ => {}
                        }
                    }
                }
                Ok(last)
            }
            ExprKind::Compare { left, rest } => {
                let mut current = self.eval(left, scope)?;
                for (op, right_expr) in rest {
                    let right = self.eval(right_expr, scope)?;
                    if !ops::compare_op(*op, &current, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    current = right;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::Call { func, args, kwargs } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, scope)?);
                }
                let mut kwarg_values = Vec::with_capacity(kwargs.len());
                for (name, value_expr) in kwargs {
                    kwarg_values.push((name.clone(), self.eval(value_expr, scope)?));
                }
                // Method calls dispatch straight on the receiver.
                if let ExprKind::Attribute { obj, name } = &func.kind {
                    let recv = self.eval(obj, scope)?;
                    return methods::call_method(self, &recv, name, arg_values, kwarg_values);
                }
                let callee = self.eval(func, scope)?;
                self.call_callable(&callee, arg_values, kwarg_values)
            }
            ExprKind::Attribute { obj, name } => {
                let recv = self.eval(obj, scope)?;
                methods::bind_method(&recv, name)
            }
            ExprKind::Subscript { obj, index } => {
                let container = self.eval(obj, scope)?;
                match index.as_ref() {
                    Index::Item(index_expr) => {
                        let key = self.eval(index_expr, scope)?;
                        ops::get_index(&container, &key)
                    }
                    Index::Slice { start, stop, step } => {
                        let start = self.eval_slice_bound(start.as_ref(), scope)?;
                        let stop = self.eval_slice_bound(stop.as_ref(), scope)?;
                        let step = self.eval_slice_bound(step.as_ref(), scope)?;
                        ops::get_slice(&container, start, stop, step)
                    }
                }
            }
            ExprKind::IfElse { test, then, orelse } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(orelse, scope)
                }
            }
            ExprKind::Lambda { params, body } => {
                let body = Rc::new((**body).clone());
                self.make_function("<lambda>", params, scope, || FunctionBody::Expr(body))
            }
            ExprKind::ListComp {
                elt,
                target,
                iter,
                cond,
            } => {
                let iterable = self.eval(iter, scope)?;
                let state = self.iter_state_of(&iterable)?;
                let comp_scope = Scope::child(scope);
                let mut out = Vec::new();
                loop {
                    let item = state.borrow_mut().next_item();
                    let Some(item) = item else { break };
                    self.assign_target(target, item, &comp_scope)?;
                    if let Some(cond) = cond {
                        if !self.eval(cond, &comp_scope)?.truthy() {
                            continue;
                        }
                    }
                    out.push(self.eval(elt, &comp_scope)?);
                }
                Ok(Value::list(out))
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr], scope: &Rc<Scope>) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            out.push(self.eval(expr, scope)?);
        }
        Ok(out)
    }

    fn eval_slice_bound(
        &mut self,
        bound: Option<&Expr>,
        scope: &Rc<Scope>,
    ) -> EvalResult<Option<i64>> {
        let Some(expr) = bound else { return Ok(None) };
        match self.eval(expr, scope)? {
            Value::None => Ok(None),
            Value::Int(i) => Ok(Some(i)),
            Value::Bool(b) => Ok(Some(if b { 1 } else { 0 })),
            other => Err(PyExc::type_error(format!(
                "slice indices must be integers or None, not {}",
                other.type_name()
            ))),
        }
    }

    // ---- calls ---------------------------------------------------------

    pub fn call_callable(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        match callee {
            Value::Function(function) => {
                let function = Rc::clone(function);
                self.call_user_function(&function, args, kwargs)
            }
            Value::Builtin(builtin) => calls::call_builtin(self, *builtin, args, kwargs),
            Value::Class(class) => calls::call_class(self, *class, args, kwargs),
            Value::BoundMethod(method) => {
                let method = Rc::clone(method);
                methods::call_method(self, &method.recv, &method.name, args, kwargs)
            }
            other => Err(PyExc::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn call_user_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        if self.call_depth >= self.max_call_depth {
            return Err(PyExc::new(
                ExcType::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }

        let scope = Scope::child(&function.closure);
        let params = &function.params;
        if args.len() > params.len() {
            return Err(PyExc::type_error(format!(
                "{}() takes {} positional argument{} but {} were given",
                function.name,
                params.len(),
                if params.len() == 1 { "" } else { "s" },
                args.len()
            )));
        }
        for (param, value) in params.iter().zip(args.iter()) {
            scope.assign(&param.name, value.clone());
        }
        for (name, value) in kwargs {
            let position = params.iter().position(|p| p.name == name).ok_or_else(|| {
                PyExc::type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    function.name, name
                ))
            })?;
            if position < args.len() {
                return Err(PyExc::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    function.name, name
                )));
            }
            scope.assign(&name, value);
        }
        for (param, default) in params.iter().zip(function.defaults.iter()) {
            let bound = scope.vars.borrow().contains_key(&param.name);
            if !bound {
                match default {
                    Some(value) => scope.assign(&param.name, value.clone()),
                    None => {
                        return Err(PyExc::type_error(format!(
                            "{}() missing 1 required positional argument: '{}'",
                            function.name, param.name
                        )));
                    }
                }
            }
        }

        self.call_depth += 1;
        let result = match &function.body {
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope) {
                Ok(Flow::Return(value)) => Ok(value),
                Ok(_) => Ok(Value::None),
                Err(exc) => Err(exc),
            },
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
        };
        self.call_depth -= 1;
        result
    }

    /// Shared iteration state: existing iterators keep their position,
    /// everything else starts fresh.
    pub(crate) fn iter_state_of(&self, value: &Value) -> EvalResult<Rc<RefCell<IterState>>> {
        match value {
            Value::Iterator(state) => Ok(Rc::clone(state)),
            other => Ok(Rc::new(RefCell::new(ops::make_iter(other)?))),
        }
    }
}

/// `target op= rhs`. In-place list extension keeps the allocation so
/// aliases observe the update, matching reference semantics.
fn aug_value(op: BinOp, current: Value, rhs: Value) -> EvalResult<Value> {
    if op == BinOp::Add {
        if let Value::List(items) = &current {
            let additions = ops::iter_to_vec(&rhs)?;
            items.borrow_mut().extend(additions);
            return Ok(current);
        }
    }
    ops::binary_op(op, &current, &rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parser::parse;
    use crate::lang::value::{py_eq, py_repr};

    fn run(source: &str) -> Interp {
        let module = parse(source).unwrap();
        let mut interp = Interp::new();
        interp.run_module(&module).unwrap();
        interp
    }

    fn run_err(source: &str) -> PyExc {
        let module = parse(source).unwrap();
        let mut interp = Interp::new();
        interp.run_module(&module).unwrap_err()
    }

    fn global(interp: &Interp, name: &str) -> Value {
        interp.global_lookup(name).unwrap()
    }

    fn check(source: &str, name: &str, expected: Value) {
        let interp = run(source);
        let got = global(&interp, name);
        assert!(
            py_eq(&got, &expected),
            "{} was {}, expected {}",
            name,
            py_repr(&got),
            py_repr(&expected)
        );
    }

    #[test]
    fn arithmetic_and_assignment() {
        check("x = 2 + 3 * 4\n", "x", Value::Int(14));
        check("x = (2 + 3) * 4\n", "x", Value::Int(20));
        check("x = 2 ** 10\n", "x", Value::Int(1024));
    }

    #[test]
    fn function_definition_and_call() {
        check("def double(x):\n    return x * 2\ny = double(21)\n", "y", Value::Int(42));
    }

    #[test]
    fn keyword_invocation_binds_by_name() {
        check(
            "def f(a, b):\n    return a - b\nr = f(b=1, a=10)\n",
            "r",
            Value::Int(9),
        );
    }

    #[test]
    fn defaults_fill_missing_arguments() {
        check(
            "def f(a, b=5):\n    return a + b\nr = f(1)\n",
            "r",
            Value::Int(6),
        );
    }

    #[test]
    fn missing_argument_is_a_type_error() {
        let exc = run_err("def f(a, b):\n    return a\nf(1)\n");
        assert_eq!(exc.ty, ExcType::TypeError);
        assert!(exc.message.contains("missing 1 required positional argument"));
    }

    #[test]
    fn while_loop_with_break_and_continue() {
        check(
            "total = 0\nn = 0\nwhile True:\n    n += 1\n    if n > 10:\n        break\n    if n % 2 == 0:\n        continue\n    total += n\n",
            "total",
            Value::Int(25),
        );
    }

    #[test]
    fn for_loop_over_range_and_list() {
        check(
            "total = 0\nfor i in range(5):\n    total += i\n",
            "total",
            Value::Int(10),
        );
        check(
            "total = 0\nfor x in [1, 2, 3]:\n    total += x\n",
            "total",
            Value::Int(6),
        );
    }

    #[test]
    fn tuple_unpacking_and_swap() {
        check("a, b = 1, 2\na, b = b, a\n", "a", Value::Int(2));
        let exc = run_err("a, b = [1, 2, 3]\n");
        assert_eq!(exc.ty, ExcType::ValueError);
        assert!(exc.message.contains("too many values"));
    }

    #[test]
    fn aliased_lists_share_mutations() {
        check(
            "a = [1]\nb = a\na.append(2)\nn = len(b)\n",
            "n",
            Value::Int(2),
        );
        check(
            "a = [1]\nb = a\na += [2]\nn = len(b)\n",
            "n",
            Value::Int(2),
        );
    }

    #[test]
    fn zero_division_raises() {
        let exc = run_err("x = 1 / 0\n");
        assert_eq!(exc.ty, ExcType::ZeroDivisionError);
        assert_eq!(exc.message, "division by zero");
    }

    #[test]
    fn unknown_name_raises_name_error() {
        let exc = run_err("x = os\n");
        assert_eq!(exc.ty, ExcType::NameError);
        assert_eq!(exc.message, "name 'os' is not defined");
    }

    #[test]
    fn import_is_rejected_at_run_time() {
        let exc = run_err("import os\n");
        assert_eq!(exc.ty, ExcType::ImportError);
        assert!(exc.message.contains("os"));
    }

    #[test]
    fn try_except_catches_matching_class() {
        check(
            "try:\n    x = 1 / 0\nexcept ZeroDivisionError:\n    x = -1\n",
            "x",
            Value::Int(-1),
        );
        check(
            "try:\n    raise ValueError('bad')\nexcept Exception as e:\n    msg = str(e)\n",
            "msg",
            Value::str("bad"),
        );
    }

    #[test]
    fn unmatched_handler_reraises() {
        let exc = run_err("try:\n    x = 1 / 0\nexcept ValueError:\n    x = -1\n");
        assert_eq!(exc.ty, ExcType::ZeroDivisionError);
    }

    #[test]
    fn finally_always_runs() {
        check(
            "log = []\ntry:\n    log.append(1)\nexcept ValueError:\n    log.append(2)\nfinally:\n    log.append(3)\nn = len(log)\n",
            "n",
            Value::Int(2),
        );
    }

    #[test]
    fn conditional_expression_and_boolean_values() {
        check("x = 'a' if 1 < 2 else 'b'\n", "x", Value::str("a"));
        check("x = 0 or 'fallback'\n", "x", Value::str("fallback"));
        check("x = 1 and 2\n", "x", Value::Int(2));
    }

    #[test]
    fn chained_comparisons_short_circuit() {
        check("ok = 1 < 2 < 3\n", "ok", Value::Bool(true));
        check("ok = 1 < 2 > 5\n", "ok", Value::Bool(false));
    }

    #[test]
    fn list_comprehension_with_condition() {
        check(
            "ys = [x * x for x in range(6) if x % 2 == 0]\nn = len(ys)\ntop = ys[2]\n",
            "top",
            Value::Int(16),
        );
    }

    #[test]
    fn comprehension_variable_does_not_leak() {
        let exc = run_err("ys = [x for x in range(3)]\nz = x\n");
        assert_eq!(exc.ty, ExcType::NameError);
    }

    #[test]
    fn lambdas_and_closures() {
        check(
            "def make_adder(n):\n    return lambda x: x + n\nadd3 = make_adder(3)\nr = add3(4)\n",
            "r",
            Value::Int(7),
        );
    }

    #[test]
    fn recursion_limit_is_a_catchable_error() {
        let module = parse("def f():\n    return f()\nf()\n").unwrap();
        let mut interp = Interp::with_max_depth(50);
        let exc = interp.run_module(&module).unwrap_err();
        assert_eq!(exc.ty, ExcType::RecursionError);
        assert!(exc.message.contains("recursion"));
    }

    #[test]
    fn recursive_functions_work() {
        check(
            "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nr = fib(12)\n",
            "r",
            Value::Int(144),
        );
    }

    #[test]
    fn set_operators() {
        check("n = len({1, 2} | {2, 3})\n", "n", Value::Int(3));
        check("n = len({1, 2} & {2, 3})\n", "n", Value::Int(1));
        check("n = len({1, 2} ^ {2, 3})\n", "n", Value::Int(2));
        check("n = len({1, 2, 3} - {2})\n", "n", Value::Int(2));
        check(
            "n = len(frozenset({1, 2}) | frozenset({2, 3}))\n",
            "n",
            Value::Int(3),
        );
    }

    #[test]
    fn dict_and_subscript_assignment() {
        check(
            "d = {}\nd['a'] = 1\nd['a'] += 10\nv = d['a']\n",
            "v",
            Value::Int(11),
        );
    }

    #[test]
    fn raising_a_class_instantiates_it() {
        let exc = run_err("raise ValueError\n");
        assert_eq!(exc.ty, ExcType::ValueError);
    }

    #[test]
    fn print_goes_to_the_captured_stream() {
        let interp = run("print('hello', 42)\n");
        assert_eq!(String::from_utf8(interp.stdout).unwrap(), "hello 42\n");
    }

    #[test]
    fn two_sum_style_program() {
        check(
            concat!(
                "def two_sum(nums, target):\n",
                "    seen = {}\n",
                "    for i, n in enumerate(nums):\n",
                "        want = target - n\n",
                "        if want in seen:\n",
                "            return [seen[want], i]\n",
                "        seen[n] = i\n",
                "    return []\n",
                "r = two_sum([2, 7, 11, 15], 9)\n",
            ),
            "r",
            Value::list(vec![Value::Int(0), Value::Int(1)]),
        );
    }
}
