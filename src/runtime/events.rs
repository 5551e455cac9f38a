use crate::events::EventManager;
use crate::ui;

/// Mirror every pipeline event into the machine log and the debug log.
pub fn attach_console_handlers(events: &mut EventManager) {
    events.on_all(|event, ctx| {
        log::debug!("{} {:?}", event.name(), ctx.stage);
        ui::pipeline_event(event, ctx);
    });
}
