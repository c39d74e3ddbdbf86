mod buffer;
mod buffers;
mod event;

pub use buffer::EventFilter;
pub use buffer::ReadOrder;
pub use buffer::RingBuffer;
pub use buffers::BufferCapacities;
pub use buffers::BufferSet;
pub use event::Action;
pub use event::ActionKind;
pub use event::ActionSelectors;
pub use event::Annotation;
pub use event::AnnotationRect;
pub use event::ConsoleLevel;
pub use event::ConsoleLog;
pub use event::ElementDetail;
pub use event::Event;
pub use event::EventPayload;
pub use event::NetworkBody;
pub use event::NetworkWaterfallEntry;
pub use event::PerfLongTasks;
pub use event::PerfNetwork;
pub use event::PerfSnapshot;
pub use event::PerfTiming;
pub use event::UserTiming;
pub use event::WSEvent;
pub use event::WSEventKind;
