mod frame_proptest;
mod message_proptest;
