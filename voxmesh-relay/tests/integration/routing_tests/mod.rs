mod test_disconnect_broadcast;
mod test_join_fanout;
