// End-to-end tests for the response cache and the speech pipeline
//
// Nothing here touches the network or a sound card:
// - The HTTP transport is a scripted mock that counts calls
// - Time is a manual clock, so freshness is checked at exact offsets
// - Playback goes to a recording output that can be slowed down to test stop()

mod test_speech_pipeline;
