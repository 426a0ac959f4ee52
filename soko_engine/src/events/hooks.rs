use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DeliveryConfirmedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderPlacedEvent,
    PaymentConfirmedEvent,
    PaymentFailedEvent,
    PickupConfirmedEvent,
    TaskClaimedEvent,
    TaskCreatedEvent,
};

/// The producer ends of the event channels. Cloned into each API so every transition point can publish without
/// knowing who, if anyone, is listening.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub payment_confirmed_producer: Vec<EventProducer<PaymentConfirmedEvent>>,
    pub payment_failed_producer: Vec<EventProducer<PaymentFailedEvent>>,
    pub task_created_producer: Vec<EventProducer<TaskCreatedEvent>>,
    pub task_claimed_producer: Vec<EventProducer<TaskClaimedEvent>>,
    pub pickup_confirmed_producer: Vec<EventProducer<PickupConfirmedEvent>>,
    pub delivery_confirmed_producer: Vec<EventProducer<DeliveryConfirmedEvent>>,
}

pub struct EventHandlers {
    pub on_order_placed: Option<EventHandler<OrderPlacedEvent>>,
    pub on_payment_confirmed: Option<EventHandler<PaymentConfirmedEvent>>,
    pub on_payment_failed: Option<EventHandler<PaymentFailedEvent>>,
    pub on_task_created: Option<EventHandler<TaskCreatedEvent>>,
    pub on_task_claimed: Option<EventHandler<TaskClaimedEvent>>,
    pub on_pickup_confirmed: Option<EventHandler<PickupConfirmedEvent>>,
    pub on_delivery_confirmed: Option<EventHandler<DeliveryConfirmedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_placed: hooks.on_order_placed.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_confirmed: hooks.on_payment_confirmed.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_failed: hooks.on_payment_failed.map(|f| EventHandler::new(buffer_size, f)),
            on_task_created: hooks.on_task_created.map(|f| EventHandler::new(buffer_size, f)),
            on_task_claimed: hooks.on_task_claimed.map(|f| EventHandler::new(buffer_size, f)),
            on_pickup_confirmed: hooks.on_pickup_confirmed.map(|f| EventHandler::new(buffer_size, f)),
            on_delivery_confirmed: hooks.on_delivery_confirmed.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_placed {
            result.order_placed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_confirmed {
            result.payment_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_failed {
            result.payment_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_task_created {
            result.task_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_task_claimed {
            result.task_claimed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_pickup_confirmed {
            result.pickup_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivery_confirmed {
            result.delivery_confirmed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_placed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payment_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payment_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_task_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_task_claimed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_pickup_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_delivery_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

/// The subscriber side. Build one of these, attach closures for the transitions you care about, and hand it to
/// [`EventHandlers::new`]. The server uses this to persist notifications at each transition point.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_placed: Option<Handler<OrderPlacedEvent>>,
    pub on_payment_confirmed: Option<Handler<PaymentConfirmedEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
    pub on_task_created: Option<Handler<TaskCreatedEvent>>,
    pub on_task_claimed: Option<Handler<TaskClaimedEvent>>,
    pub on_pickup_confirmed: Option<Handler<PickupConfirmedEvent>>,
    pub on_delivery_confirmed: Option<Handler<DeliveryConfirmedEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_placed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }

    pub fn on_task_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TaskCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_task_created = Some(Arc::new(f));
        self
    }

    pub fn on_task_claimed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TaskClaimedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_task_claimed = Some(Arc::new(f));
        self
    }

    pub fn on_pickup_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PickupConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_pickup_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_delivery_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_delivery_confirmed = Some(Arc::new(f));
        self
    }
}
