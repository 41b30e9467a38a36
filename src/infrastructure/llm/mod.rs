pub mod openai_agent;
