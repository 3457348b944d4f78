use super::*;
use pretty_assertions::assert_eq;

fn two_people() -> Lambda {
    let mut b = LambdaBuilder::new();
    let p1 = b.param("p1");
    let p2 = b.param("p2");
    let n1 = b.member(p1, "name");
    let l1 = b.member(n1, "len");
    let n2 = b.member(p2, "name");
    let l2 = b.member(n2, "len");
    let sum = b.binary(BinaryOp::Add, l1, l2);
    b.build(sum)
}

#[test]
fn display_member_chain() {
    assert_eq!(two_people().to_string(), "|p1, p2| p1.name.len + p2.name.len");
}

#[test]
fn display_parenthesizes_by_precedence() {
    let mut b = LambdaBuilder::new();
    let x = b.param("x");
    let one = b.constant(1);
    let two = b.constant(2);
    let sum = b.binary(BinaryOp::Add, x, one);
    let product = b.binary(BinaryOp::Mul, sum, two);
    let lambda = b.build(product);
    assert_eq!(lambda.to_string(), "|x| (x + 1) * 2");
}

#[test]
fn display_right_operand_of_same_precedence() {
    let mut b = LambdaBuilder::new();
    let x = b.param("x");
    let one = b.constant(1);
    let two = b.constant(2);
    let inner = b.binary(BinaryOp::Sub, one, two);
    let outer = b.binary(BinaryOp::Sub, x, inner);
    assert_eq!(b.build(outer).to_string(), "|x| x - (1 - 2)");
}

#[test]
fn display_conditional_and_call() {
    let mut b = LambdaBuilder::new();
    let flag = b.param("flag");
    let s = b.param("s");
    let upper = b.call(s, "to_upper", &[]);
    let empty = b.constant("");
    let cond = b.conditional(flag, upper, empty);
    assert_eq!(
        b.build(cond).to_string(),
        "|flag, s| flag ? s.to_upper() : \"\""
    );
}

#[test]
fn post_order_lists_operands_first() {
    let lambda = two_people();
    let order = lambda.post_order();
    assert_eq!(order.len(), 7);
    assert_eq!(order.last().copied(), Some(lambda.body()));

    let position = |id: ExprId| order.iter().position(|x| *x == id);
    for id in &order {
        let expr = lambda.get(*id).unwrap();
        for child in lambda.arena().children(expr) {
            assert!(position(child) < position(*id));
        }
    }
}

#[test]
fn post_order_visits_shared_nodes_once() {
    let mut b = LambdaBuilder::new();
    let x = b.param("x");
    let sum = b.binary(BinaryOp::Add, x, x);
    let lambda = b.build(sum);
    assert_eq!(lambda.post_order(), vec![x, sum]);
}

#[test]
fn replace_rewrites_in_place() {
    let mut b = LambdaBuilder::new();
    let one = b.constant(1);
    let two = b.constant(2);
    let sum = b.binary(BinaryOp::Add, one, two);
    let mut lambda = b.build(sum);
    assert!(lambda.replace(sum, ExprKind::Constant(Value::int(3))));
    assert_eq!(lambda.to_string(), "|| 3");
    assert!(!lambda.replace(ExprId::new(99), ExprKind::Constant(Value::Null)));
}

#[test]
fn operand_lists_past_u16_keep_every_item() {
    for count in [65_535, 65_536, 70_000] {
        let mut b = LambdaBuilder::new();
        let items: Vec<_> = (0..count).map(|_| b.constant(0)).collect();
        let call = b.call(items[0], "f", &items);
        let list = b.new_list(&items);
        let values: Vec<_> = items.iter().map(|item| ("v", *item)).collect();
        let new = b.new_object(Constructor::new("Bag", 0, |_| Ok(Value::Null)), &[]);
        let init = b.member_init(new, &values);
        let lambda = b.build(list);

        let arena = lambda.arena();
        assert_eq!(arena.children(lambda.get(list).unwrap()).len(), count);
        assert_eq!(arena.children(lambda.get(call).unwrap()).len(), count + 1);
        assert_eq!(arena.children(lambda.get(init).unwrap()).len(), count + 1);
    }
}
