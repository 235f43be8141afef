//! Order Pipeline
//!
//! This demo runs a small order pipeline on a tick loop.
//!
//! Key concepts:
//! - Orders arrive from a data source and start at the entry state
//! - Payment runs as a nested engine while the order waits
//! - A rate-limited trigger nudges orders stuck waiting for stock
//! - A failing payment faults only the order it belongs to
//!
//! Run with: cargo run --example order_pipeline

use anyhow::bail;
use easyflow::builder::{GraphBuilder, TransitionBuilder};
use easyflow::core::Guard;
use easyflow::engine::{WorkflowDataSource, WorkflowEngine};
use easyflow::policy::ErrorPolicy;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, Default)]
struct Order {
    id: u32,
    total: u32,
    in_stock: bool,
    paid: bool,
    reminders: u32,
}

/// Hands out a fixed list of orders, a few per tick.
struct Inbox {
    orders: Mutex<Vec<Order>>,
}

impl WorkflowDataSource<Order> for Inbox {
    fn fetch(&self) -> anyhow::Result<Vec<Order>> {
        let mut orders = match self.orders.lock() {
            Ok(orders) => orders,
            Err(_) => bail!("inbox poisoned"),
        };
        let take = orders.len().min(2);
        Ok(orders.drain(..take).collect())
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(100)
    }
}

fn payment_engine() -> anyhow::Result<WorkflowEngine<Order>> {
    let engine = GraphBuilder::new("payment")
        .entry_state("Authorizing")?
        .state("Captured")?
        .transition(
            TransitionBuilder::new()
                .from("Authorizing")
                .to("Captured")
                .guard(Guard::fallible(|order: &Order| {
                    if order.total > 500 {
                        bail!("card declined for order {}", order.id)
                    }
                    Ok(true)
                }))
                .action(|order: &mut Order| order.paid = true),
        )?
        .exit_when("Captured", |_: &Order| true)?
        .default_error_policy(ErrorPolicy::StopWorkflow)
        .build()?;
    Ok(engine)
}

fn order_engine(inbox: Arc<Inbox>) -> anyhow::Result<WorkflowEngine<Order>> {
    let engine = GraphBuilder::new("orders")
        .entry_state("Received")?
        .state_with_description("AwaitingStock", "waiting for the warehouse")?
        .state_with_description("Paying", "nested payment workflow")?
        .state("Shipped")?
        .transition(
            TransitionBuilder::new()
                .from("Received")
                .to("Paying")
                .when(|order: &Order| order.in_stock),
        )?
        .define_transition("Received", "AwaitingStock")?
        .transition(
            TransitionBuilder::new()
                .from("AwaitingStock")
                .to("Paying")
                .when(|order: &Order| order.reminders >= 2)
                .action(|order: &mut Order| order.in_stock = true),
        )?
        .trigger_every("AwaitingStock", Duration::from_millis(1), |order: &mut Order| {
            order.reminders += 1
        })?
        .transition(
            TransitionBuilder::new()
                .from("Paying")
                .to("Shipped")
                .when(|order: &Order| order.paid),
        )?
        .exit_when("Shipped", |_: &Order| true)?
        .attach_subordinate("Paying", payment_engine()?)?
        .default_error_policy(ErrorPolicy::StopWorkflow)
        .data_source(inbox)
        .build()?;
    Ok(engine)
}

fn main() -> anyhow::Result<()> {
    println!("=== Order Pipeline ===\n");

    let inbox = Arc::new(Inbox {
        orders: Mutex::new(vec![
            Order { id: 1, total: 120, in_stock: true, ..Order::default() },
            Order { id: 2, total: 80, ..Order::default() },
            Order { id: 3, total: 900, in_stock: true, ..Order::default() },
        ]),
    });

    let mut engine = order_engine(inbox)?;
    for state in engine.states() {
        println!("  state {state}");
    }
    println!();

    engine.on_transitioned(|transition, order| {
        println!(
            "  [order {}] {} -> {}",
            order.data().id,
            transition.from,
            transition.to
        );
    });
    engine.on_subordinate_transitioned(|transition, order| {
        println!(
            "  [order {}] payment {} -> {}",
            order.data().id,
            transition.from,
            transition.to
        );
    });
    engine.on_completed(|_, order| println!("  [order {}] shipped", order.data().id));
    engine.on_failed(|error, order| println!("  [order {}] failed: {error}", order.data().id));

    for _ in 0..12 {
        let report = engine.tick()?;
        println!("tick {}: {} active", report.tick, engine.active_count());
        std::thread::sleep(Duration::from_millis(2));
    }

    println!(
        "\n{} ticks, {:?} per tick on average",
        engine.tick_count(),
        engine.average_tick_time()
    );
    Ok(())
}
